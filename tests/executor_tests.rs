use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use webagent::{
    ActionExecutor, AttemptState, BrowserTool, DecisionAction, DecisionEnforcer, FeedbackStatus,
    TaskGoal, ToolFailure, ToolInvocation, ToolOutput, ToolRegistry,
};

#[derive(Clone)]
enum Scripted {
    Fail(&'static str),
    Hang,
    Succeed(&'static str),
}

struct ScriptedTool {
    name: &'static str,
    script: Mutex<VecDeque<Scripted>>,
    calls: Arc<Mutex<Vec<u32>>>,
    waits: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTool {
    fn new(name: &'static str, script: Vec<Scripted>) -> Self {
        Self {
            name,
            script: Mutex::new(script.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
            waits: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl BrowserTool for ScriptedTool {
    fn name(&self) -> &str {
        self.name
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolFailure> {
        self.calls.lock().push(invocation.attempt);
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Scripted::Fail("script exhausted"));
        match next {
            Scripted::Fail(message) => Err(ToolFailure::new("E_NOT_CLICKABLE", message)),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ToolOutput::new("late"))
            }
            Scripted::Succeed(message) => Ok(ToolOutput::new(message)),
        }
    }

    async fn wait_for(&self, condition: &str, _budget: Duration) -> Result<(), ToolFailure> {
        self.waits.lock().push(condition.to_string());
        Ok(())
    }
}

fn executor_with(tool: Arc<ScriptedTool>) -> ActionExecutor {
    ActionExecutor::new(ToolRegistry::new().with(tool))
}

#[tokio::test]
async fn three_failures_never_reach_a_fourth_attempt() -> AnyResult<()> {
    let tool = Arc::new(ScriptedTool::new(
        "click",
        vec![
            Scripted::Fail("covered"),
            Scripted::Fail("covered"),
            Scripted::Fail("still covered"),
            Scripted::Succeed("clicked"),
        ],
    ));
    let calls = Arc::clone(&tool.calls);
    let executor = executor_with(tool);

    let report = executor
        .execute(DecisionAction::new("click", 0.7).with_max_attempts(3))
        .await?;

    assert_eq!(report.attempts, 3);
    assert_eq!(*calls.lock(), vec![1, 2, 3]);
    assert_eq!(report.final_state, AttemptState::FailedTerminal);
    assert_eq!(report.feedback.status, FeedbackStatus::Failed);
    assert_eq!(report.feedback.error_code.to_string(), "E_NOT_CLICKABLE");
    assert_eq!(report.feedback.message, "still covered");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_then_success_reports_two_attempts() -> AnyResult<()> {
    let goal = TaskGoal::new("task-1", "login", "Log into the dashboard")
        .with_allowed_actions(["click", "type"])
        .with_step_budget_secs(60);
    let proposed = DecisionAction::new("click", 0.9)
        .with_arg("xpath", "//button[@id='login']")
        .with_max_attempts(2)
        .with_timeout_secs(10);
    let action = DecisionEnforcer::new().validate(&goal, proposed)?;

    let tool = Arc::new(ScriptedTool::new(
        "click",
        vec![Scripted::Hang, Scripted::Succeed("clicked login")],
    ));
    let executor = executor_with(tool);
    let report = executor.execute(action).await?;

    assert_eq!(report.attempts, 2);
    assert_eq!(report.feedback.status, FeedbackStatus::Success);
    assert_eq!(report.feedback.status.as_str(), "SUCCESS");
    assert_eq!(report.feedback.message, "clicked login");
    let states: Vec<_> = report.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            AttemptState::Executing,
            AttemptState::TimedOut,
            AttemptState::Pending,
            AttemptState::Executing,
            AttemptState::Succeeded,
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn exhausted_timeouts_surface_as_timeout_feedback() -> AnyResult<()> {
    let tool = Arc::new(ScriptedTool::new("type", vec![Scripted::Hang, Scripted::Hang]));
    let executor = executor_with(tool);

    let report = executor
        .execute(
            DecisionAction::new("type", 0.6)
                .with_max_attempts(2)
                .with_timeout_secs(5),
        )
        .await?;

    assert_eq!(report.attempts, 2);
    assert_eq!(report.final_state, AttemptState::TimedOut);
    assert_eq!(report.feedback.status, FeedbackStatus::Timeout);
    assert_eq!(report.feedback.error_code.to_string(), "TIMEOUT");
    Ok(())
}

#[tokio::test]
async fn wait_condition_runs_after_the_call() -> AnyResult<()> {
    let tool = Arc::new(ScriptedTool::new("click", vec![Scripted::Succeed("ok")]));
    let waits = Arc::clone(&tool.waits);
    let executor = executor_with(tool);

    let report = executor
        .execute(DecisionAction::new("click", 0.9).with_wait_for("network_idle"))
        .await?;

    assert!(report.succeeded());
    assert_eq!(*waits.lock(), vec!["network_idle".to_string()]);
    Ok(())
}

/// Clicks fine, but the page only settles after `unsettled` failed waits.
struct SettlingTool {
    calls: Mutex<u32>,
    unsettled: Mutex<u32>,
}

#[async_trait]
impl BrowserTool for SettlingTool {
    fn name(&self) -> &str {
        "click"
    }

    async fn call(&self, _invocation: ToolInvocation) -> Result<ToolOutput, ToolFailure> {
        *self.calls.lock() += 1;
        Ok(ToolOutput::new("clicked"))
    }

    async fn wait_for(&self, _condition: &str, _budget: Duration) -> Result<(), ToolFailure> {
        let mut unsettled = self.unsettled.lock();
        if *unsettled > 0 {
            *unsettled -= 1;
            return Err(ToolFailure::new("E_WAIT_FAILED", "network never went idle"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn failed_wait_counts_as_a_failed_attempt() -> AnyResult<()> {
    let tool = Arc::new(SettlingTool {
        calls: Mutex::new(0),
        unsettled: Mutex::new(1),
    });
    let executor = ActionExecutor::new(ToolRegistry::new().with(tool.clone()));
    let report = executor
        .execute(
            DecisionAction::new("click", 0.8)
                .with_wait_for("network_idle")
                .with_max_attempts(2),
        )
        .await?;
    assert!(report.succeeded());
    assert_eq!(report.attempts, 2);
    assert_eq!(*tool.calls.lock(), 2);

    let tool = Arc::new(SettlingTool {
        calls: Mutex::new(0),
        unsettled: Mutex::new(1),
    });
    let executor = ActionExecutor::new(ToolRegistry::new().with(tool));
    let report = executor
        .execute(DecisionAction::new("click", 0.8).with_wait_for("network_idle"))
        .await?;
    assert_eq!(report.final_state, AttemptState::FailedTerminal);
    assert_eq!(report.feedback.status, FeedbackStatus::Failed);
    assert_eq!(report.feedback.error_code.to_string(), "E_WAIT_FAILED");
    Ok(())
}
