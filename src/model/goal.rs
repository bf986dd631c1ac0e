use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::dynamic::DynamicData;
use super::timestamp::UtcTimestamp;

pub const DEFAULT_STEP_BUDGET_SECS: i64 = 60;
pub const DEFAULT_PRIORITY: i64 = 5;
pub const DEFAULT_PERSONA: &str = "standard_user";
pub const DEFAULT_ENVIRONMENT: &str = "desktop_chrome";
pub const DEFAULT_ALLOWED_ACTIONS: &[&str] = &["click", "type", "scroll", "extract", "wait"];

/// 单步标识 `(task_uuid, step_id)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepKey {
    pub task_uuid: String,
    pub step_id: String,
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task_uuid, self.step_id)
    }
}

/// 交给决策引擎的单步目标
///
/// 反序列化时不校验不变量，由 [`crate::contract::GoalValidator`] 完整报告。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskGoal {
    pub task_uuid: String,
    pub step_id: String,
    pub target_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_deadline_utc: Option<UtcTimestamp>,
    #[serde(default = "default_step_budget")]
    pub max_execution_time_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_data: Option<DynamicData>,
    #[serde(default = "default_persona")]
    pub current_agent_persona: String,
    #[serde(default = "default_environment")]
    pub execution_environment: String,
    #[serde(default = "default_allowed_actions")]
    pub allowed_actions: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority_level: i64,
}

impl TaskGoal {
    pub fn new(
        task_uuid: impl Into<String>,
        step_id: impl Into<String>,
        target_description: impl Into<String>,
    ) -> Self {
        Self {
            task_uuid: task_uuid.into(),
            step_id: step_id.into(),
            target_description: target_description.into(),
            task_deadline_utc: None,
            max_execution_time_seconds: DEFAULT_STEP_BUDGET_SECS,
            required_data: None,
            current_agent_persona: default_persona(),
            execution_environment: default_environment(),
            allowed_actions: default_allowed_actions(),
            priority_level: DEFAULT_PRIORITY,
        }
    }

    /// 以新生成的 `task_uuid` 开启任务
    pub fn for_new_task(step_id: impl Into<String>, target_description: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), step_id, target_description)
    }

    /// 替换动作空间，重复项只保留首次出现
    pub fn with_allowed_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for action in actions {
            let action = action.into();
            if !allowed.contains(&action) {
                allowed.push(action);
            }
        }
        self.allowed_actions = allowed;
        self
    }

    pub fn with_step_budget_secs(mut self, seconds: i64) -> Self {
        self.max_execution_time_seconds = seconds;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority_level = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: UtcTimestamp) -> Self {
        self.task_deadline_utc = Some(deadline);
        self
    }

    pub fn with_required_data(mut self, data: DynamicData) -> Self {
        self.required_data = Some(data);
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.current_agent_persona = persona.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.execution_environment = environment.into();
        self
    }

    pub fn allows(&self, tool_name: &str) -> bool {
        self.allowed_actions.iter().any(|allowed| allowed == tool_name)
    }

    pub fn step_key(&self) -> StepKey {
        StepKey {
            task_uuid: self.task_uuid.clone(),
            step_id: self.step_id.clone(),
        }
    }

    /// 单步时间预算，非正值时为 `None`
    pub fn step_budget(&self) -> Option<Duration> {
        u64::try_from(self.max_execution_time_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn deadline_elapsed(&self, now: &UtcTimestamp) -> bool {
        self.task_deadline_utc
            .as_ref()
            .map(|deadline| deadline.is_before(now))
            .unwrap_or(false)
    }
}

fn default_step_budget() -> i64 {
    DEFAULT_STEP_BUDGET_SECS
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_allowed_actions() -> Vec<String> {
    DEFAULT_ALLOWED_ACTIONS.iter().map(|s| s.to_string()).collect()
}
