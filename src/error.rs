use thiserror::Error;

use crate::contract::{ContractViolation, EnforcementError};
use crate::plan::GraphError;

pub type Result<T> = std::result::Result<T, WebAgentError>;

#[derive(Debug, Error)]
pub enum WebAgentError {
    #[error("contract validation failed: {}", join_violations(.0))]
    Validation(Vec<ContractViolation>),
    #[error("tool `{tool}` is outside the allowed actions [{}]", .allowed.join(", "))]
    ScopeViolation { tool: String, allowed: Vec<String> },
    #[error("tool `{tool}` failed after {attempts} attempt(s): {message}")]
    ExecutionFailure {
        tool: String,
        attempts: u32,
        message: String,
    },
    #[error("tool `{tool}` exceeded its {timeout_secs}s budget")]
    Timeout { tool: String, timeout_secs: u64 },
    #[error(transparent)]
    Enforcement(EnforcementError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("tool `{0}` not registered")]
    ToolNotRegistered(String),
    #[error("invalid transition from `{from}` to `{to}`")]
    InvalidTransition { from: String, to: String },
    #[error("invalid timestamp `{value}`: {reason}")]
    Timestamp { value: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WebAgentError {
    /// 用于日志与反馈错误码的稳定标识
    pub fn code(&self) -> &'static str {
        match self {
            WebAgentError::Validation(_) => "VALIDATION_ERROR",
            WebAgentError::ScopeViolation { .. } => "SCOPE_VIOLATION",
            WebAgentError::ExecutionFailure { .. } => "EXECUTION_FAILURE",
            WebAgentError::Timeout { .. } => "TIMEOUT",
            WebAgentError::Enforcement(err) => err.code(),
            WebAgentError::Graph(err) => err.code(),
            WebAgentError::ToolNotRegistered(_) => "TOOL_NOT_REGISTERED",
            WebAgentError::InvalidTransition { .. } => "INVALID_TRANSITION",
            WebAgentError::Timestamp { .. } => "INVALID_TIMESTAMP",
            WebAgentError::Serialization(_) => "SERIALIZATION_ERROR",
            WebAgentError::Config(_) => "CONFIG_ERROR",
            WebAgentError::Other(_) => "SYSTEM_EXCEPTION",
        }
    }

    /// 校验错误与越权不会重试
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WebAgentError::Validation(_)
                | WebAgentError::ScopeViolation { .. }
                | WebAgentError::Enforcement(_)
        )
    }
}

impl From<EnforcementError> for WebAgentError {
    fn from(error: EnforcementError) -> Self {
        match error {
            EnforcementError::InvalidTool { tool, allowed } => {
                WebAgentError::ScopeViolation { tool, allowed }
            }
            other => WebAgentError::Enforcement(other),
        }
    }
}

impl From<serde_json::Error> for WebAgentError {
    fn from(error: serde_json::Error) -> Self {
        WebAgentError::Serialization(error.to_string())
    }
}

fn join_violations(violations: &[ContractViolation]) -> String {
    violations
        .iter()
        .map(|violation| violation.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tool_becomes_scope_violation() {
        let err: WebAgentError = EnforcementError::InvalidTool {
            tool: "scroll".into(),
            allowed: vec!["click".into(), "type".into()],
        }
        .into();
        assert!(matches!(err, WebAgentError::ScopeViolation { .. }));
        assert_eq!(err.code(), "SCOPE_VIOLATION");
        assert!(err.is_terminal());
        assert!(err.to_string().contains("[click, type]"));
    }

    #[test]
    fn validation_message_lists_every_violation() {
        let err = WebAgentError::Validation(vec![
            ContractViolation::EmptyAllowedActions,
            ContractViolation::PriorityOutOfRange { value: 0 },
        ]);
        let text = err.to_string();
        assert!(text.contains("allowed_actions"));
        assert!(text.contains("priority_level"));
    }
}
