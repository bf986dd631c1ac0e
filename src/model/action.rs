use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::dynamic::DynamicData;

pub const DEFAULT_MAX_ATTEMPTS: i64 = 1;
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// 终态失败后的处理策略
///
/// 仅供调用方循环参考，执行器不读取。`STOP_TASK` 视为 `ABORT` 的旧写法。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FailurePolicy {
    #[default]
    ReEvaluate,
    Abort,
    RetrySame,
    Escalate,
    Other(String),
}

impl FailurePolicy {
    pub fn as_str(&self) -> &str {
        match self {
            FailurePolicy::ReEvaluate => "RE_EVALUATE",
            FailurePolicy::Abort => "ABORT",
            FailurePolicy::RetrySame => "RETRY_SAME",
            FailurePolicy::Escalate => "ESCALATE",
            FailurePolicy::Other(raw) => raw,
        }
    }
}

impl From<String> for FailurePolicy {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RE_EVALUATE" => FailurePolicy::ReEvaluate,
            "ABORT" | "STOP_TASK" => FailurePolicy::Abort,
            "RETRY_SAME" => FailurePolicy::RetrySame,
            "ESCALATE" => FailurePolicy::Escalate,
            _ => FailurePolicy::Other(raw),
        }
    }
}

impl From<FailurePolicy> for String {
    fn from(policy: FailurePolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 决策引擎每轮给出的唯一工具调用
///
/// 预算字段保留有符号类型，越界值由 [`crate::contract::DecisionEnforcer`] 拒绝。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionAction {
    pub tool_name: String,
    #[serde(default)]
    pub tool_args: DynamicData,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
    #[serde(default = "default_timeout_secs")]
    pub execution_timeout_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_condition_after: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default)]
    pub on_failure_action: FailurePolicy,
}

impl DecisionAction {
    pub fn new(tool_name: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_args: DynamicData::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            execution_timeout_seconds: DEFAULT_TIMEOUT_SECS,
            wait_for_condition_after: None,
            reasoning: String::new(),
            confidence_score,
            expected_outcome: String::new(),
            on_failure_action: FailurePolicy::default(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tool_args.insert(key, value);
        self
    }

    pub fn with_args(mut self, args: DynamicData) -> Self {
        self.tool_args = args;
        self
    }

    pub fn with_max_attempts(mut self, attempts: i64) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_timeout_secs(mut self, seconds: i64) -> Self {
        self.execution_timeout_seconds = seconds;
        self
    }

    pub fn with_wait_for(mut self, condition: impl Into<String>) -> Self {
        self.wait_for_condition_after = Some(condition.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure_action = policy;
        self
    }

    /// 尝试次数预算，至少为 1
    pub fn attempt_budget(&self) -> u32 {
        u32::try_from(self.max_attempts.max(1)).unwrap_or(u32::MAX)
    }

    /// 单次尝试超时，至少 1 秒
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.execution_timeout_seconds.max(1)).unwrap_or(1))
    }
}

fn default_max_attempts() -> i64 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_timeout_secs() -> i64 {
    DEFAULT_TIMEOUT_SECS
}
