use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::model::{codes, ActionFeedback, DecisionAction};
use crate::tools::{BrowserTool, ToolFailure, ToolInvocation, ToolOutput, ToolRegistry};

use super::state::{AttemptState, AttemptTracker};
use super::types::ExecutionReport;

/// 动作执行器
///
/// 执行一个已校验的 [`DecisionAction`]，负责尝试次数与超时预算；
/// `on_failure_action` 由调用方处理。
#[derive(Clone)]
pub struct ActionExecutor {
    tools: Arc<ToolRegistry>,
}

impl ActionExecutor {
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    #[instrument(skip_all, fields(tool = %action.tool_name, max_attempts = action.max_attempts))]
    pub async fn execute(&self, action: DecisionAction) -> Result<ExecutionReport> {
        let started = Instant::now();
        let mut tracker = AttemptTracker::new(action.attempt_budget());

        let Some(tool) = self.tools.get(&action.tool_name) else {
            warn!("tool not registered, nothing executed");
            return Ok(ExecutionReport {
                tool_name: action.tool_name.clone(),
                attempts: 0,
                final_state: AttemptState::FailedTerminal,
                feedback: ActionFeedback::failed(
                    codes::TOOL_NOT_REGISTERED,
                    format!("tool `{}` not registered", action.tool_name),
                ),
                transitions: Vec::new(),
                elapsed_ms: elapsed_ms(started),
            });
        };

        let budget = action.timeout();
        let feedback = loop {
            let attempt = tracker.begin()?;
            let invocation = ToolInvocation {
                name: action.tool_name.clone(),
                args: action.tool_args.clone(),
                attempt,
            };
            let call = run_attempt(
                tool.as_ref(),
                invocation,
                action.wait_for_condition_after.as_deref(),
                budget,
            );

            match timeout(budget, call).await {
                Ok(Ok(output)) => {
                    tracker.succeed()?;
                    break ActionFeedback::success(output.message);
                }
                Ok(Err(failure)) => {
                    let state = tracker.fail()?;
                    warn!(
                        attempt,
                        error_code = %failure.error_code,
                        error = %failure.message,
                        "tool invocation failed"
                    );
                    if state == AttemptState::FailedTerminal {
                        break ActionFeedback::failed(failure.error_code, failure.message);
                    }
                    tracker.retry()?;
                }
                Err(_) => {
                    tracker.time_out()?;
                    warn!(attempt, timeout_secs = budget.as_secs(), "tool invocation timed out");
                    if tracker.is_terminal() {
                        break ActionFeedback::timeout(format!(
                            "tool `{}` exceeded {}s on attempt {}",
                            action.tool_name,
                            budget.as_secs(),
                            attempt
                        ));
                    }
                    tracker.retry()?;
                }
            }
        };

        info!(
            attempts = tracker.attempts_used(),
            state = %tracker.state(),
            status = %feedback.status,
            "action settled"
        );

        Ok(ExecutionReport {
            tool_name: action.tool_name,
            attempts: tracker.attempts_used(),
            final_state: tracker.state(),
            feedback,
            transitions: tracker.into_history(),
            elapsed_ms: elapsed_ms(started),
        })
    }
}

async fn run_attempt(
    tool: &dyn BrowserTool,
    invocation: ToolInvocation,
    wait_for: Option<&str>,
    budget: Duration,
) -> std::result::Result<ToolOutput, ToolFailure> {
    let output = tool.call(invocation).await?;
    if let Some(condition) = wait_for {
        tool.wait_for(condition, budget).await?;
    }
    Ok(output)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeedbackStatus;
    use async_trait::async_trait;

    struct Flaky {
        failures_before_success: u32,
    }

    #[async_trait]
    impl BrowserTool for Flaky {
        fn name(&self) -> &str {
            "click"
        }

        async fn call(
            &self,
            invocation: ToolInvocation,
        ) -> std::result::Result<ToolOutput, ToolFailure> {
            if invocation.attempt <= self.failures_before_success {
                Err(ToolFailure::new("E_NOT_CLICKABLE", "element covered"))
            } else {
                Ok(ToolOutput::new("clicked"))
            }
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let executor = ActionExecutor::new(ToolRegistry::new().with(Arc::new(Flaky {
            failures_before_success: 1,
        })));
        let report = executor
            .execute(DecisionAction::new("click", 0.9).with_max_attempts(2))
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);
        assert!(report.succeeded());
        assert_eq!(report.feedback.message, "clicked");
    }

    #[tokio::test]
    async fn unregistered_tool_fails_without_attempts() {
        let executor = ActionExecutor::new(ToolRegistry::new());
        let report = executor
            .execute(DecisionAction::new("hover", 0.9).with_max_attempts(3))
            .await
            .unwrap();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.feedback.status, FeedbackStatus::Failed);
        assert_eq!(report.feedback.error_code.to_string(), codes::TOOL_NOT_REGISTERED);
    }
}
