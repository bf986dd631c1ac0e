use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::{
    DecisionEnforcer, EnforcementError, GoalValidator, ObservationChecker, Verdict,
};
use crate::error::Result;
use crate::model::{DecisionAction, TaskGoal, UtcTimestamp, WebObservation};
use crate::plan::{load_plan_file, DynamicReference, ExecutionGraph, GraphSummary, NodeStatus};
use crate::tools::ToolCatalog;
use crate::utils::ConfigValidator;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

/// 结构检查，并按当前时间检查截止时间
pub fn validate_goal_file(path: &Path) -> Result<(TaskGoal, Verdict)> {
    let goal: TaskGoal = read_json(path)?;
    let verdict = GoalValidator.validate_at(&goal, &UtcTimestamp::now());
    Ok((goal, verdict))
}

/// 按目标文件校验动作文件，`strict` 时同时检查工具参数
pub fn check_action_files(
    goal_path: &Path,
    action_path: &Path,
    strict: bool,
) -> Result<std::result::Result<DecisionAction, EnforcementError>> {
    let goal: TaskGoal = read_json(goal_path)?;
    let action: DecisionAction = read_json(action_path)?;
    let enforcer = if strict {
        DecisionEnforcer::new().with_catalog(ToolCatalog::builtin())
    } else {
        DecisionEnforcer::new()
    };
    Ok(enforcer.validate(&goal, action))
}

pub fn check_observation_file(
    path: &Path,
    first_in_step: bool,
) -> Result<(WebObservation, Verdict)> {
    let observation: WebObservation = read_json(path)?;
    let verdict = ObservationChecker.check(&observation, first_in_step);
    Ok((observation, verdict))
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanEntry {
    pub depth: usize,
    pub node_id: String,
    pub parent_id: Option<String>,
    pub priority: i64,
    pub tool_name: String,
    pub status: NodeStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanInspection {
    pub root: Option<String>,
    /// 从根广度优先，子节点按优先级
    pub nodes: Vec<PlanEntry>,
    pub references: Vec<DynamicReference>,
    pub summary: GraphSummary,
    pub warnings: Vec<String>,
}

pub fn inspect_plan_file(path: &Path) -> Result<PlanInspection> {
    let graph = load_plan_file(path)?;
    Ok(inspect_plan(&graph))
}

pub fn inspect_plan(graph: &ExecutionGraph) -> PlanInspection {
    let mut nodes = Vec::with_capacity(graph.len());
    let mut visited = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = graph
        .root_id()
        .map(|root| (root.to_string(), 0))
        .into_iter()
        .collect();
    while let Some((id, depth)) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = graph.get(&id) else {
            continue;
        };
        nodes.push(PlanEntry {
            depth,
            node_id: node.node_id.clone(),
            parent_id: node.parent_id.clone(),
            priority: node.execution_order_priority,
            tool_name: node.action.tool_name.clone(),
            status: node.current_status,
        });
        queue.extend(node.child_ids.iter().map(|child| (child.clone(), depth + 1)));
    }

    let mut warnings: Vec<String> = graph
        .nodes()
        .filter(|node| !visited.contains(&node.node_id))
        .map(|node| format!("node `{}` is unreachable from the root", node.node_id))
        .collect();
    warnings.extend(
        graph
            .nodes()
            .filter_map(|node| ConfigValidator::validate_node_id(&node.node_id).err())
            .map(|err| err.to_string()),
    );
    let references = graph.dynamic_references();
    warnings.extend(
        references
            .iter()
            .filter(|reference| graph.get(&reference.source_node).is_none())
            .map(|reference| {
                format!(
                    "node `{}` argument `{}` references unknown node `{}`",
                    reference.node_id, reference.key, reference.source_node
                )
            }),
    );

    PlanInspection {
        root: graph.root_id().map(str::to_string),
        nodes,
        references,
        summary: graph.summary(),
        warnings,
    }
}
