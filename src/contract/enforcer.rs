use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{DecisionAction, TaskGoal};
use crate::tools::ToolCatalog;

pub const CONFIDENCE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=1.0;

#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnforcementError {
    #[error("tool `{tool}` is not in allowed_actions [{}]", .allowed.join(", "))]
    InvalidTool { tool: String, allowed: Vec<String> },
    #[error("confidence_score {value} is outside [0.0, 1.0]")]
    InvalidConfidence { value: f64 },
    #[error("invalid budget: max_attempts={max_attempts}, execution_timeout_seconds={execution_timeout_seconds}")]
    InvalidBudget {
        max_attempts: i64,
        execution_timeout_seconds: i64,
    },
    #[error("arguments for `{tool}` drift from its schema (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    InvalidArguments {
        tool: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

impl EnforcementError {
    pub fn code(&self) -> &'static str {
        match self {
            EnforcementError::InvalidTool { .. } => "INVALID_TOOL",
            EnforcementError::InvalidConfidence { .. } => "INVALID_CONFIDENCE",
            EnforcementError::InvalidBudget { .. } => "INVALID_BUDGET",
            EnforcementError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
        }
    }

    pub fn is_scope_violation(&self) -> bool {
        matches!(self, EnforcementError::InvalidTool { .. })
    }
}

/// 决策引擎与执行器之间的关卡
///
/// 按工具、置信度、预算、参数的顺序检查，返回第一个失败；通过的动作原样返回。
#[derive(Clone, Debug, Default)]
pub struct DecisionEnforcer {
    catalog: Option<Arc<ToolCatalog>>,
}

impl DecisionEnforcer {
    pub fn new() -> Self {
        Self { catalog: None }
    }

    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn catalog(&self) -> Option<&ToolCatalog> {
        self.catalog.as_deref()
    }

    pub fn validate(
        &self,
        goal: &TaskGoal,
        action: DecisionAction,
    ) -> Result<DecisionAction, EnforcementError> {
        match self.check(goal, &action) {
            Ok(()) => {
                debug!(
                    step = %goal.step_key(),
                    tool = %action.tool_name,
                    confidence = action.confidence_score,
                    "decision accepted"
                );
                Ok(action)
            }
            Err(err) => {
                warn!(
                    step = %goal.step_key(),
                    tool = %action.tool_name,
                    code = err.code(),
                    reasoning = %action.reasoning,
                    error = %err,
                    "decision rejected"
                );
                Err(err)
            }
        }
    }

    pub fn check(&self, goal: &TaskGoal, action: &DecisionAction) -> Result<(), EnforcementError> {
        if !goal.allows(&action.tool_name) {
            return Err(EnforcementError::InvalidTool {
                tool: action.tool_name.clone(),
                allowed: goal.allowed_actions.clone(),
            });
        }

        if !CONFIDENCE_RANGE.contains(&action.confidence_score) {
            return Err(EnforcementError::InvalidConfidence {
                value: action.confidence_score,
            });
        }

        if action.max_attempts < 1 || action.execution_timeout_seconds <= 0 {
            return Err(EnforcementError::InvalidBudget {
                max_attempts: action.max_attempts,
                execution_timeout_seconds: action.execution_timeout_seconds,
            });
        }

        if let Some(spec) = self
            .catalog
            .as_deref()
            .and_then(|catalog| catalog.get(&action.tool_name))
        {
            let (missing, unexpected) = spec.check_args(&action.tool_args);
            if !missing.is_empty() || !unexpected.is_empty() {
                return Err(EnforcementError::InvalidArguments {
                    tool: action.tool_name.clone(),
                    missing,
                    unexpected,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> TaskGoal {
        TaskGoal::new("task", "S1", "search").with_allowed_actions(["click", "type"])
    }

    fn click() -> DecisionAction {
        DecisionAction::new("click", 0.9)
            .with_arg("xpath", "//button[@id='go']")
            .with_max_attempts(2)
            .with_timeout_secs(10)
    }

    #[test]
    fn passes_valid_action_through_unchanged() {
        let action = click();
        let accepted = DecisionEnforcer::new().validate(&goal(), action.clone()).unwrap();
        assert_eq!(accepted, action);
    }

    #[test]
    fn rejects_tool_outside_action_space() {
        let err = DecisionEnforcer::new()
            .validate(&goal(), DecisionAction::new("scroll", 0.9))
            .unwrap_err();
        assert!(err.is_scope_violation());
        assert_eq!(
            err,
            EnforcementError::InvalidTool {
                tool: "scroll".into(),
                allowed: vec!["click".into(), "type".into()],
            }
        );
    }

    #[test]
    fn rejects_confidence_outside_unit_interval() {
        let enforcer = DecisionEnforcer::new();
        for value in [-0.01, 1.01, f64::NAN] {
            let err = enforcer
                .validate(&goal(), DecisionAction::new("click", value))
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_CONFIDENCE");
        }
        assert!(enforcer.validate(&goal(), DecisionAction::new("click", 0.0)).is_ok());
        assert!(enforcer.validate(&goal(), DecisionAction::new("click", 1.0)).is_ok());
    }

    #[test]
    fn rejects_empty_budgets() {
        let enforcer = DecisionEnforcer::new();
        let no_attempts = click().with_max_attempts(0);
        let no_time = click().with_timeout_secs(0);
        assert!(matches!(
            enforcer.validate(&goal(), no_attempts),
            Err(EnforcementError::InvalidBudget { max_attempts: 0, .. })
        ));
        assert!(matches!(
            enforcer.validate(&goal(), no_time),
            Err(EnforcementError::InvalidBudget {
                execution_timeout_seconds: 0,
                ..
            })
        ));
    }

    #[test]
    fn tool_check_runs_before_other_checks() {
        let err = DecisionEnforcer::new()
            .validate(&goal(), DecisionAction::new("scroll", 4.0).with_max_attempts(0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TOOL");
    }

    #[test]
    fn catalog_catches_argument_drift() {
        let enforcer = DecisionEnforcer::new().with_catalog(ToolCatalog::builtin());
        assert!(enforcer.validate(&goal(), click()).is_ok());

        let drifted = DecisionAction::new("click", 0.9).with_arg("target", "#go");
        let err = enforcer.validate(&goal(), drifted).unwrap_err();
        assert!(matches!(
            err,
            EnforcementError::InvalidArguments { ref unexpected, .. }
                if unexpected == &vec!["target".to_string()]
        ));
    }

    #[test]
    fn repeated_validation_yields_the_same_verdict() {
        let enforcer = DecisionEnforcer::new();
        let action = DecisionAction::new("scroll", 0.5);
        let first = enforcer.validate(&goal(), action.clone());
        let second = enforcer.validate(&goal(), action);
        assert_eq!(first, second);
    }
}
