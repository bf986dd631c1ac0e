use serde::{Deserialize, Serialize};

use crate::model::ActionFeedback;

use super::state::{AttemptState, AttemptTransition};

/// 动作执行结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub tool_name: String,
    pub attempts: u32,
    pub final_state: AttemptState,
    pub feedback: ActionFeedback,
    pub transitions: Vec<AttemptTransition>,
    pub elapsed_ms: u64,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == AttemptState::Succeeded
    }
}
