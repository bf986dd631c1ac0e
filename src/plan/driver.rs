use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::RuntimeConfig;
use crate::contract::{DecisionEnforcer, GoalValidator};
use crate::error::{Result, WebAgentError};
use crate::model::{
    codes, ActionFeedback, DynamicData, ErrorCode, FailurePolicy, TaskGoal, UtcTimestamp,
};
use crate::runtime::ActionExecutor;

use super::graph::{ExecutionGraph, GraphSummary};
use super::node::{ExecutionNode, NodeStatus};

/// 失败节点记录，供重新规划时避开
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub node_id: String,
    pub tool_name: String,
    pub tool_args: DynamicData,
    pub error_code: ErrorCode,
    pub error_message: String,
    pub reasoning: String,
    pub recorded_at: UtcTimestamp,
}

/// 纠错规划的输入
#[derive(Clone, Debug)]
pub struct CorrectionRequest {
    /// 围绕失败改写描述后的目标
    pub goal: TaskGoal,
    pub failed_node: ExecutionNode,
    pub feedback: ActionFeedback,
    pub history: Vec<FailureRecord>,
}

/// `RE_EVALUATE` 失败后生成纠错节点
#[async_trait]
pub trait Replanner: Send + Sync {
    async fn correction_plan(&self, request: CorrectionRequest) -> Result<Vec<ExecutionNode>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// 已无可达的 PENDING 节点
    Completed,
    /// 因失败而停止
    Halted { node_id: String, reason: String },
    IterationLimit { limit: u32 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanReport {
    pub outcome: PlanOutcome,
    pub iterations: u32,
    pub summary: GraphSummary,
    pub failures: Vec<FailureRecord>,
}

/// 计划执行驱动
///
/// 逐个节点执行 [`ExecutionGraph`]：解析引用、校验、执行，成功记录输出，失败剪枝并应用策略。
pub struct PlanDriver {
    executor: ActionExecutor,
    enforcer: DecisionEnforcer,
    replanner: Option<Arc<dyn Replanner>>,
    max_iterations: u32,
}

impl PlanDriver {
    pub fn new(executor: ActionExecutor) -> Self {
        Self {
            executor,
            enforcer: DecisionEnforcer::new(),
            replanner: None,
            max_iterations: RuntimeConfig::default().max_plan_iterations,
        }
    }

    pub fn with_replanner(mut self, replanner: Arc<dyn Replanner>) -> Self {
        self.replanner = Some(replanner);
        self
    }

    pub fn with_enforcer(mut self, enforcer: DecisionEnforcer) -> Self {
        self.enforcer = enforcer;
        self
    }

    pub fn with_config(mut self, config: &RuntimeConfig) -> Self {
        self.max_iterations = config.max_plan_iterations.max(1);
        self
    }

    #[instrument(skip_all, fields(step = %goal.step_key(), nodes = graph.len()))]
    pub async fn run(&self, goal: &TaskGoal, graph: &mut ExecutionGraph) -> Result<PlanReport> {
        GoalValidator.validate(goal).into_result()?;

        let mut iterations = 0;
        let mut failures: Vec<FailureRecord> = Vec::new();
        let outcome = loop {
            if iterations >= self.max_iterations {
                warn!(limit = self.max_iterations, "plan iteration limit reached");
                break PlanOutcome::IterationLimit {
                    limit: self.max_iterations,
                };
            }
            let Some(node_id) = graph.next_pending().map(|node| node.node_id.clone()) else {
                break PlanOutcome::Completed;
            };
            iterations += 1;
            graph.set_status(&node_id, NodeStatus::Running)?;

            let action = match graph.resolve_dynamic_args(&node_id) {
                Ok(action) => action,
                Err(err) => {
                    warn!(node = %node_id, error = %err, "argument resolution failed");
                    let feedback =
                        ActionFeedback::failed(codes::ARG_RESOLVE_ERROR, err.to_string());
                    match self
                        .handle_failure(goal, graph, &node_id, feedback, &mut failures)
                        .await?
                    {
                        Some(outcome) => break outcome,
                        None => continue,
                    }
                }
            };
            if let Some(node) = graph.get_mut(&node_id) {
                node.action = action.clone();
            }

            let action = match self.enforcer.validate(goal, action) {
                Ok(action) => action,
                Err(err) => {
                    let err = WebAgentError::from(err);
                    warn!(node = %node_id, error = %err, code = err.code(), "node rejected");
                    graph.prune_on_failure(&node_id, &format!("[{}] {}", err.code(), err))?;
                    return Err(err);
                }
            };
            info!(node = %node_id, tool = %action.tool_name, "executing node");
            let report = self.executor.execute(action).await?;

            if report.succeeded() {
                graph.record_success(&node_id, Some(report.feedback.message), None)?;
                continue;
            }
            if let Some(outcome) = self
                .handle_failure(goal, graph, &node_id, report.feedback, &mut failures)
                .await?
            {
                break outcome;
            }
        };

        let summary = graph.summary();
        info!(outcome = ?outcome, iterations, %summary, "plan finished");
        Ok(PlanReport {
            outcome,
            iterations,
            summary,
            failures,
        })
    }

    /// 计划需要停止时返回 `Some`
    async fn handle_failure(
        &self,
        goal: &TaskGoal,
        graph: &mut ExecutionGraph,
        node_id: &str,
        feedback: ActionFeedback,
        failures: &mut Vec<FailureRecord>,
    ) -> Result<Option<PlanOutcome>> {
        graph.prune_on_failure(node_id, &feedback.message)?;
        let Some(node) = graph.get(node_id).cloned() else {
            return Ok(None);
        };
        record_failure(graph, node_id, &feedback, failures);

        let halt = |reason: String| {
            Some(PlanOutcome::Halted {
                node_id: node_id.to_string(),
                reason,
            })
        };

        let policy = node.action.on_failure_action.clone();
        match policy {
            FailurePolicy::Abort => Ok(halt(format!("{} on failure", FailurePolicy::Abort))),
            FailurePolicy::ReEvaluate => {
                let Some(replanner) = &self.replanner else {
                    return Ok(halt("no replanner configured".to_string()));
                };
                let request = CorrectionRequest {
                    goal: correction_goal(goal, &node, &feedback),
                    failed_node: node,
                    feedback,
                    history: failures.clone(),
                };
                match replanner.correction_plan(request).await {
                    Ok(nodes) if !nodes.is_empty() => {
                        graph.inject_correction(node_id, nodes)?;
                        Ok(None)
                    }
                    Ok(_) => {
                        warn!(node = node_id, "replanner returned an empty correction plan");
                        Ok(halt("empty correction plan".to_string()))
                    }
                    Err(err) => {
                        warn!(node = node_id, error = %err, code = err.code(), "replanning failed");
                        Ok(halt(format!("replanning failed: {}", err)))
                    }
                }
            }
            _ => Ok(None),
        }
    }
}

/// 将 `node_id` 的失败追加到本次运行的历史
fn record_failure(
    graph: &ExecutionGraph,
    node_id: &str,
    feedback: &ActionFeedback,
    failures: &mut Vec<FailureRecord>,
) {
    let Some(node) = graph.get(node_id) else {
        return;
    };
    failures.push(FailureRecord {
        node_id: node.node_id.clone(),
        tool_name: node.action.tool_name.clone(),
        tool_args: node.action.tool_args.clone(),
        error_code: feedback.error_code.clone(),
        error_message: feedback.message.clone(),
        reasoning: node.action.reasoning.clone(),
        recorded_at: UtcTimestamp::now(),
    });
    warn!(
        node = node_id,
        error_code = %feedback.error_code,
        message = %feedback.message,
        failures = failures.len(),
        "node failed"
    );
}

fn correction_goal(goal: &TaskGoal, node: &ExecutionNode, feedback: &ActionFeedback) -> TaskGoal {
    let mut correction = goal.clone();
    correction.target_description = format!(
        "Original goal: {}\nFailed step: `{}` ({})\nError: {}\nProduce a short corrective plan (1-3 steps) that recovers and still reaches the original goal.",
        goal.target_description, node.action.tool_name, node.node_id, feedback.message
    );
    correction
}
