use serde::Serialize;
use thiserror::Error;

use crate::error::{Result, WebAgentError};

#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractViolation {
    #[error("allowed_actions must not be empty")]
    EmptyAllowedActions,
    #[error("priority_level {value} is outside [1, 10]")]
    PriorityOutOfRange { value: i64 },
    #[error("max_execution_time_seconds must be positive, got {value}")]
    NonPositiveStepBudget { value: i64 },
    #[error("`{field}` must not be empty")]
    MissingIdentifier { field: &'static str },
    #[error("task deadline {deadline} has already passed")]
    DeadlineElapsed { deadline: String },
    #[error("element `{element_id}` has an invalid bounding box")]
    InvalidBoundingBox { element_id: String },
    #[error("http_status_code {value} is outside [100, 599]")]
    InvalidHttpStatus { value: i32 },
    #[error("page_load_time_ms must not be negative, got {value}")]
    NegativeLoadTime { value: i64 },
    #[error("last_action_feedback is required after the first observation of a step")]
    MissingFeedback,
    #[error("the first observation of a step must not carry last_action_feedback")]
    UnexpectedFeedback,
}

impl ContractViolation {
    pub fn label(&self) -> &'static str {
        match self {
            ContractViolation::EmptyAllowedActions => "empty_allowed_actions",
            ContractViolation::PriorityOutOfRange { .. } => "priority_out_of_range",
            ContractViolation::NonPositiveStepBudget { .. } => "non_positive_step_budget",
            ContractViolation::MissingIdentifier { .. } => "missing_identifier",
            ContractViolation::DeadlineElapsed { .. } => "deadline_elapsed",
            ContractViolation::InvalidBoundingBox { .. } => "invalid_bounding_box",
            ContractViolation::InvalidHttpStatus { .. } => "invalid_http_status",
            ContractViolation::NegativeLoadTime { .. } => "negative_load_time",
            ContractViolation::MissingFeedback => "missing_feedback",
            ContractViolation::UnexpectedFeedback => "unexpected_feedback",
        }
    }
}

/// 结构检查结果：有效，或全部违反项
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Verdict {
    violations: Vec<ContractViolation>,
}

impl Verdict {
    pub fn from_violations(violations: Vec<ContractViolation>) -> Self {
        Self { violations }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[ContractViolation] {
        &self.violations
    }

    pub fn into_result(self) -> Result<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(WebAgentError::Validation(self.violations))
        }
    }
}
