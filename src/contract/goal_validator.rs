use crate::model::{TaskGoal, UtcTimestamp};

use super::violation::{ContractViolation, Verdict};

pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// 在进入决策引擎前拒绝结构无效的目标
#[derive(Clone, Copy, Debug, Default)]
pub struct GoalValidator;

impl GoalValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, goal: &TaskGoal) -> Verdict {
        Verdict::from_violations(structural_violations(goal))
    }

    /// 同 [`GoalValidator::validate`]，另外拒绝早于 `now` 的截止时间
    pub fn validate_at(&self, goal: &TaskGoal, now: &UtcTimestamp) -> Verdict {
        let mut violations = structural_violations(goal);
        if goal.deadline_elapsed(now) {
            if let Some(deadline) = &goal.task_deadline_utc {
                violations.push(ContractViolation::DeadlineElapsed {
                    deadline: deadline.to_iso8601(),
                });
            }
        }
        Verdict::from_violations(violations)
    }
}

fn structural_violations(goal: &TaskGoal) -> Vec<ContractViolation> {
    let mut violations = Vec::new();
    if goal.task_uuid.trim().is_empty() {
        violations.push(ContractViolation::MissingIdentifier { field: "task_uuid" });
    }
    if goal.step_id.trim().is_empty() {
        violations.push(ContractViolation::MissingIdentifier { field: "step_id" });
    }
    if goal.allowed_actions.is_empty() {
        violations.push(ContractViolation::EmptyAllowedActions);
    }
    if !PRIORITY_RANGE.contains(&goal.priority_level) {
        violations.push(ContractViolation::PriorityOutOfRange {
            value: goal.priority_level,
        });
    }
    if goal.max_execution_time_seconds <= 0 {
        violations.push(ContractViolation::NonPositiveStepBudget {
            value: goal.max_execution_time_seconds,
        });
    }
    violations
}
