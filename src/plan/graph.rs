use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{DecisionAction, WebObservation};

use super::node::{ExecutionNode, NodeStatus};

const REFERENCE_PREFIX: &str = "{result_of:";
const REFERENCE_SUFFIX: &str = "}";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node `{0}` already exists")]
    DuplicateNode(String),
    #[error("node `{node}` would be a second root (root is `{root}`)")]
    SecondRoot { root: String, node: String },
    #[error("node `{0}` not found")]
    UnknownNode(String),
    #[error("argument `{key}` of node `{node}` references `{source_node}`: {reason}")]
    UnresolvedReference {
        node: String,
        key: String,
        source_node: String,
        reason: String,
    },
    #[error("plan contains no nodes")]
    EmptyPlan,
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

impl GraphError {
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::DuplicateNode(_) => "DUPLICATE_NODE",
            GraphError::SecondRoot { .. } => "SECOND_ROOT",
            GraphError::UnknownNode(_) => "UNKNOWN_NODE",
            GraphError::UnresolvedReference { .. } => "ARG_RESOLVE_ERROR",
            GraphError::EmptyPlan => "EMPTY_PLAN",
            GraphError::InvalidPlan(_) => "INVALID_PLAN",
        }
    }
}

/// 计划中的 `{result_of:NODE_ID}` 参数
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DynamicReference {
    pub node_id: String,
    pub key: String,
    pub source_node: String,
}

/// 各状态的节点数
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
    pub pruned: usize,
    pub skipped: usize,
}

impl GraphSummary {
    pub fn count(&self, status: NodeStatus) -> usize {
        match status {
            NodeStatus::Pending => self.pending,
            NodeStatus::Running => self.running,
            NodeStatus::Success => self.success,
            NodeStatus::Failed => self.failed,
            NodeStatus::Pruned => self.pruned,
            NodeStatus::Skipped => self.skipped,
        }
    }
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node(s)", self.total)?;
        for status in NodeStatus::ALL {
            let count = self.count(status);
            if count > 0 {
                write!(f, ", {} {}", count, status)?;
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanDocument {
    Wrapped { nodes: Vec<ExecutionNode> },
    Bare(Vec<ExecutionNode>),
}

/// 动态执行图
///
/// 子节点按优先级排序，只有 SUCCESS 节点的子节点可以执行。
#[derive(Clone, Debug, Default)]
pub struct ExecutionGraph {
    nodes: HashMap<String, ExecutionNode>,
    order: Vec<String>,
    root: Option<String>,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 `{"nodes": [...]}` 或节点数组
    pub fn from_json(raw: &str) -> Result<Self, GraphError> {
        let document: PlanDocument =
            serde_json::from_str(raw).map_err(|err| GraphError::InvalidPlan(err.to_string()))?;
        let nodes = match document {
            PlanDocument::Wrapped { nodes } | PlanDocument::Bare(nodes) => nodes,
        };
        Self::from_nodes(nodes)
    }

    pub fn from_value(value: Value) -> Result<Self, GraphError> {
        let document: PlanDocument =
            serde_json::from_value(value).map_err(|err| GraphError::InvalidPlan(err.to_string()))?;
        let nodes = match document {
            PlanDocument::Wrapped { nodes } | PlanDocument::Bare(nodes) => nodes,
        };
        Self::from_nodes(nodes)
    }

    pub fn from_nodes(nodes: Vec<ExecutionNode>) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::EmptyPlan);
        }
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        if graph.root.is_none() {
            return Err(GraphError::InvalidPlan("plan has no root node".to_string()));
        }
        for node in graph.nodes.values() {
            if let Some(child) = node
                .child_ids
                .iter()
                .find(|child| !graph.nodes.contains_key(child.as_str()))
            {
                return Err(GraphError::InvalidPlan(format!(
                    "node `{}` lists unknown child `{}`",
                    node.node_id, child
                )));
            }
        }
        info!(nodes = graph.len(), root = ?graph.root, "plan loaded");
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn get(&self, node_id: &str) -> Option<&ExecutionNode> {
        self.nodes.get(node_id)
    }

    pub fn get_mut(&mut self, node_id: &str) -> Option<&mut ExecutionNode> {
        self.nodes.get_mut(node_id)
    }

    /// 按插入顺序
    pub fn nodes(&self) -> impl Iterator<Item = &ExecutionNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn add_node(&mut self, mut node: ExecutionNode) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.node_id) {
            return Err(GraphError::DuplicateNode(node.node_id));
        }
        if node.parent_id.is_none() {
            if let Some(root) = &self.root {
                return Err(GraphError::SecondRoot {
                    root: root.clone(),
                    node: node.node_id,
                });
            }
            self.root = Some(node.node_id.clone());
        }

        // 收养先于父节点出现的子节点
        for id in &self.order {
            if let Some(existing) = self.nodes.get(id) {
                if existing.parent_id.as_deref() == Some(node.node_id.as_str())
                    && !node.child_ids.contains(id)
                {
                    node.child_ids.push(id.clone());
                }
            }
        }

        let node_id = node.node_id.clone();
        let parent_id = node.parent_id.clone();
        self.order.push(node_id.clone());
        self.nodes.insert(node_id.clone(), node);
        self.sort_children(&node_id);

        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                if !parent.child_ids.contains(&node_id) {
                    parent.child_ids.push(node_id.clone());
                }
            }
            self.sort_children(&parent_id);
        }
        Ok(())
    }

    /// 经 SUCCESS 节点可达的最高优先级 PENDING 节点，同优先级取广度优先先遇到者
    pub fn next_pending(&self) -> Option<&ExecutionNode> {
        let root = self.root.as_ref()?;
        let mut queue = VecDeque::from([root.as_str()]);
        let mut visited = HashSet::new();
        let mut best: Option<&ExecutionNode> = None;

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            match node.current_status {
                NodeStatus::Pending => {
                    if best.map_or(true, |current| {
                        node.execution_order_priority < current.execution_order_priority
                    }) {
                        best = Some(node);
                    }
                }
                NodeStatus::Success => {
                    queue.extend(node.child_ids.iter().map(String::as_str));
                }
                _ => {}
            }
        }
        best
    }

    pub fn set_status(&mut self, node_id: &str, status: NodeStatus) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        debug!(node = node_id, from = %node.current_status, to = %status, "node status");
        node.current_status = status;
        Ok(())
    }

    /// 标记 SUCCESS 并记录输出
    pub fn record_success(
        &mut self,
        node_id: &str,
        output: Option<String>,
        observation: Option<WebObservation>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        node.current_status = NodeStatus::Success;
        node.failure_reason = None;
        if let Some(output) = output.filter(|output| !output.is_empty()) {
            node.resolved_output = Some(output);
        }
        if observation.is_some() {
            node.last_observation = observation;
        }
        Ok(())
    }

    /// 标记 FAILED（已成功则不变）并剪除 PENDING/SKIPPED 后代，返回剪除数量
    pub fn prune_on_failure(&mut self, node_id: &str, reason: &str) -> Result<usize, GraphError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        if node.current_status != NodeStatus::Success {
            node.current_status = NodeStatus::Failed;
            node.failure_reason = Some(reason.to_string());
        }

        let mut queue: VecDeque<String> = node.child_ids.iter().cloned().collect();
        let mut pruned = 0;
        while let Some(id) = queue.pop_front() {
            let Some(child) = self.nodes.get_mut(&id) else {
                continue;
            };
            if matches!(child.current_status, NodeStatus::Pending | NodeStatus::Skipped) {
                child.current_status = NodeStatus::Pruned;
                child.failure_reason =
                    Some(format!("pruned after failure of ancestor `{}`", node_id));
                queue.extend(child.child_ids.iter().cloned());
                pruned += 1;
            }
        }
        debug!(node = node_id, pruned, "pruned failed branch");
        Ok(pruned)
    }

    /// 用纠错节点替代失败节点
    ///
    /// 入口节点按顺序串联，挂到失败节点的父节点下并排在其余兄弟之前；
    /// 根节点失败时第一个入口成为新根。返回注入的节点 ID。
    pub fn inject_correction(
        &mut self,
        failed_id: &str,
        corrections: Vec<ExecutionNode>,
    ) -> Result<Vec<String>, GraphError> {
        let failed = self
            .nodes
            .get(failed_id)
            .ok_or_else(|| GraphError::UnknownNode(failed_id.to_string()))?;
        if corrections.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        for node in &corrections {
            if self.nodes.contains_key(&node.node_id) || !seen.insert(node.node_id.as_str()) {
                return Err(GraphError::DuplicateNode(node.node_id.clone()));
            }
        }

        let anchor = failed.parent_id.clone();
        let base_priority = anchor
            .as_deref()
            .and_then(|parent| self.nodes.get(parent))
            .map(|parent| {
                parent
                    .child_ids
                    .iter()
                    .filter_map(|id| self.nodes.get(id))
                    .map(|sibling| sibling.execution_order_priority)
                    .min()
                    .unwrap_or(failed.execution_order_priority)
            })
            .unwrap_or(failed.execution_order_priority);
        let entry_priority = base_priority.min(failed.execution_order_priority).saturating_sub(1);

        let ids: HashSet<String> = corrections.iter().map(|n| n.node_id.clone()).collect();
        let mut injected = Vec::with_capacity(corrections.len());
        let mut previous_entry: Option<String> = None;
        let replacing_root = anchor.is_none();

        let (entries, inner): (Vec<_>, Vec<_>) = corrections.into_iter().partition(|node| {
            node.parent_id
                .as_ref()
                .map_or(true, |parent| !ids.contains(parent))
        });

        for mut node in entries {
            node.parent_id = previous_entry.clone().or_else(|| anchor.clone());
            node.execution_order_priority = entry_priority;
            node.current_status = NodeStatus::Pending;
            if node.parent_id.is_none() && replacing_root {
                self.root = None;
            }
            previous_entry = Some(node.node_id.clone());
            injected.push(node.node_id.clone());
            self.add_node(node)?;
        }
        for mut node in inner {
            node.current_status = NodeStatus::Pending;
            injected.push(node.node_id.clone());
            self.add_node(node)?;
        }

        info!(failed = failed_id, injected = ?injected, "correction plan injected");
        Ok(injected)
    }

    /// 返回替换 `{result_of:NODE_ID}` 参数后的动作
    pub fn resolve_dynamic_args(&self, node_id: &str) -> Result<DecisionAction, GraphError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.to_string()))?;
        let mut action = node.action.clone();

        for (key, value) in node.action.tool_args.iter() {
            let Some(source_id) = parse_reference(value) else {
                continue;
            };
            let unresolved = |reason: String| GraphError::UnresolvedReference {
                node: node_id.to_string(),
                key: key.clone(),
                source_node: source_id.to_string(),
                reason,
            };
            let source = self
                .nodes
                .get(source_id)
                .ok_or_else(|| unresolved("source node not found".to_string()))?;
            if source.current_status != NodeStatus::Success {
                return Err(unresolved(format!(
                    "source node is {}",
                    source.current_status
                )));
            }
            let output = source
                .resolved_output
                .as_ref()
                .ok_or_else(|| unresolved("source node captured no output".to_string()))?;
            action.tool_args.insert(key.clone(), output.clone());
        }
        Ok(action)
    }

    pub fn dynamic_references(&self) -> Vec<DynamicReference> {
        self.nodes()
            .flat_map(|node| {
                node.action.tool_args.iter().filter_map(move |(key, value)| {
                    parse_reference(value).map(|source| DynamicReference {
                        node_id: node.node_id.clone(),
                        key: key.clone(),
                        source_node: source.to_string(),
                    })
                })
            })
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            total: self.nodes.len(),
            ..GraphSummary::default()
        };
        for node in self.nodes.values() {
            let slot = match node.current_status {
                NodeStatus::Pending => &mut summary.pending,
                NodeStatus::Running => &mut summary.running,
                NodeStatus::Success => &mut summary.success,
                NodeStatus::Failed => &mut summary.failed,
                NodeStatus::Pruned => &mut summary.pruned,
                NodeStatus::Skipped => &mut summary.skipped,
            };
            *slot += 1;
        }
        summary
    }

    fn sort_children(&mut self, node_id: &str) {
        let Some(children) = self.nodes.get(node_id).map(|node| node.child_ids.clone()) else {
            return;
        };
        let mut keyed: Vec<(i64, String)> = children
            .into_iter()
            .map(|child| {
                let priority = self
                    .nodes
                    .get(&child)
                    .map_or(i64::MAX, |node| node.execution_order_priority);
                (priority, child)
            })
            .collect();
        keyed.sort_by_key(|(priority, _)| *priority);
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.child_ids = keyed.into_iter().map(|(_, child)| child).collect();
        }
    }
}

/// 读取计划文件
pub fn load_plan_file(path: impl AsRef<Path>) -> crate::error::Result<ExecutionGraph> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file {}", path.display()))?;
    Ok(ExecutionGraph::from_json(&raw)?)
}

fn parse_reference(value: &str) -> Option<&str> {
    value
        .strip_prefix(REFERENCE_PREFIX)?
        .strip_suffix(REFERENCE_SUFFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty())
}
