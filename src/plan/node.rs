use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{DecisionAction, WebObservation};

pub const DEFAULT_NODE_PRIORITY: i64 = 1;
pub const DEFAULT_PRECONDITION: &str = "True";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Pruned,
    Skipped,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 6] = [
        NodeStatus::Pending,
        NodeStatus::Running,
        NodeStatus::Success,
        NodeStatus::Failed,
        NodeStatus::Pruned,
        NodeStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "PENDING",
            NodeStatus::Running => "RUNNING",
            NodeStatus::Success => "SUCCESS",
            NodeStatus::Failed => "FAILED",
            NodeStatus::Pruned => "PRUNED",
            NodeStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 执行图节点
///
/// `execution_order_priority` 越小越先执行。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionNode {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default = "default_priority")]
    pub execution_order_priority: i64,
    pub action: DecisionAction,
    #[serde(default)]
    pub current_status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// 执行前预期的页面状态，仅作说明
    #[serde(default = "default_precondition")]
    pub required_precondition: String,
    #[serde(default = "default_cost")]
    pub expected_cost_units: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observation: Option<WebObservation>,
    /// 执行结果，后续节点通过 `{result_of:NODE_ID}` 引用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_output: Option<String>,
}

impl ExecutionNode {
    pub fn new(node_id: impl Into<String>, action: DecisionAction) -> Self {
        Self {
            node_id: node_id.into(),
            parent_id: None,
            child_ids: Vec::new(),
            execution_order_priority: DEFAULT_NODE_PRIORITY,
            action,
            current_status: NodeStatus::Pending,
            failure_reason: None,
            required_precondition: DEFAULT_PRECONDITION.to_string(),
            expected_cost_units: 1,
            last_observation: None,
            resolved_output: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.execution_order_priority = priority;
        self
    }

    pub fn with_precondition(mut self, precondition: impl Into<String>) -> Self {
        self.required_precondition = precondition.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

fn default_priority() -> i64 {
    DEFAULT_NODE_PRIORITY
}

fn default_precondition() -> String {
    DEFAULT_PRECONDITION.to_string()
}

fn default_cost() -> i64 {
    1
}
