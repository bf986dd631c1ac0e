use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebAgentError};

/// 单次动作执行的尝试状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    Pending,
    Executing,
    Succeeded,
    FailedRetryable,
    FailedTerminal,
    TimedOut,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::Pending => "PENDING",
            AttemptState::Executing => "EXECUTING",
            AttemptState::Succeeded => "SUCCEEDED",
            AttemptState::FailedRetryable => "FAILED_RETRYABLE",
            AttemptState::FailedTerminal => "FAILED_TERMINAL",
            AttemptState::TimedOut => "TIMED_OUT",
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptTransition {
    pub attempt: u32,
    pub from: AttemptState,
    pub to: AttemptState,
}

/// 重试状态机
///
/// `PENDING → EXECUTING → {SUCCEEDED, FAILED_RETRYABLE, FAILED_TERMINAL, TIMED_OUT}`。
/// 超时消耗一次尝试，预算用尽后才是终态；用满 `max_attempts` 后不能再开始尝试。
#[derive(Clone, Debug)]
pub struct AttemptTracker {
    max_attempts: u32,
    attempts_used: u32,
    state: AttemptState,
    history: Vec<AttemptTransition>,
}

impl AttemptTracker {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts_used: 0,
            state: AttemptState::Pending,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn has_remaining(&self) -> bool {
        self.attempts_used < self.max_attempts
    }

    pub fn history(&self) -> &[AttemptTransition] {
        &self.history
    }

    pub fn into_history(self) -> Vec<AttemptTransition> {
        self.history
    }

    pub fn is_terminal(&self) -> bool {
        match self.state {
            AttemptState::Succeeded | AttemptState::FailedTerminal => true,
            AttemptState::TimedOut => !self.has_remaining(),
            _ => false,
        }
    }

    /// `PENDING → EXECUTING`，返回从 1 开始的尝试序号
    pub fn begin(&mut self) -> Result<u32> {
        if self.state != AttemptState::Pending || !self.has_remaining() {
            return Err(self.invalid(AttemptState::Executing));
        }
        self.attempts_used += 1;
        self.move_to(AttemptState::Executing);
        Ok(self.attempts_used)
    }

    pub fn succeed(&mut self) -> Result<()> {
        self.expect_executing(AttemptState::Succeeded)?;
        self.move_to(AttemptState::Succeeded);
        Ok(())
    }

    /// 记录一次失败，预算未用尽时进入 `FAILED_RETRYABLE`
    pub fn fail(&mut self) -> Result<AttemptState> {
        let next = if self.has_remaining() {
            AttemptState::FailedRetryable
        } else {
            AttemptState::FailedTerminal
        };
        self.expect_executing(next)?;
        self.move_to(next);
        Ok(next)
    }

    pub fn time_out(&mut self) -> Result<()> {
        self.expect_executing(AttemptState::TimedOut)?;
        self.move_to(AttemptState::TimedOut);
        Ok(())
    }

    /// 可重试失败或非终态超时回到 `PENDING`
    pub fn retry(&mut self) -> Result<()> {
        let retryable = match self.state {
            AttemptState::FailedRetryable => true,
            AttemptState::TimedOut => self.has_remaining(),
            _ => false,
        };
        if !retryable {
            return Err(self.invalid(AttemptState::Pending));
        }
        self.move_to(AttemptState::Pending);
        Ok(())
    }

    fn expect_executing(&self, to: AttemptState) -> Result<()> {
        if self.state == AttemptState::Executing {
            Ok(())
        } else {
            Err(self.invalid(to))
        }
    }

    fn move_to(&mut self, to: AttemptState) {
        self.history.push(AttemptTransition {
            attempt: self.attempts_used,
            from: self.state,
            to,
        });
        self.state = to;
    }

    fn invalid(&self, to: AttemptState) -> WebAgentError {
        WebAgentError::InvalidTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}
