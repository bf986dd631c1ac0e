use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::RuntimeConfig;
use crate::contract::{DecisionEnforcer, GoalValidator, ObservationChecker};
use crate::error::Result;
use crate::model::{
    ActionFeedback, DecisionAction, FailurePolicy, StepKey, TaskGoal, UtcTimestamp,
};
use crate::runtime::{ActionExecutor, ExecutionReport};
use crate::tools::ToolCatalog;

use super::memory::MemoryComposer;
use super::{DecisionEngine, ObservationRequest, PerceptionLayer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLimit {
    MaxCycles,
    StepTime,
    TaskDeadline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Aborted,
    Escalated,
    BudgetExhausted { limit: BudgetLimit },
}

/// 一轮观察/决策/执行
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: u32,
    pub action: DecisionAction,
    /// `action` 的执行记录，仅 `RETRY_SAME` 时多于一条
    pub executions: Vec<ExecutionReport>,
    /// 本轮观察是否通过一致性检查
    pub observation_consistent: bool,
}

impl CycleRecord {
    pub fn final_feedback(&self) -> Option<&ActionFeedback> {
        self.executions.last().map(|report| &report.feedback)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepReport {
    pub step: StepKey,
    pub outcome: StepOutcome,
    pub cycles: Vec<CycleRecord>,
    pub memory_context: String,
    pub elapsed_ms: u64,
}

impl StepReport {
    pub fn last_feedback(&self) -> Option<&ActionFeedback> {
        self.cycles.last().and_then(CycleRecord::final_feedback)
    }

    pub fn total_attempts(&self) -> u32 {
        self.cycles
            .iter()
            .flat_map(|cycle| cycle.executions.iter())
            .map(|report| report.attempts)
            .sum()
    }
}

/// 单步控制循环
///
/// 目标校验失败与被拒绝的决策在执行前以 `Err` 返回；
/// 执行失败按动作的 `on_failure_action` 处理。
pub struct StepRunner {
    perception: Arc<dyn PerceptionLayer>,
    engine: Arc<dyn DecisionEngine>,
    executor: ActionExecutor,
    enforcer: DecisionEnforcer,
    memory: MemoryComposer,
    config: RuntimeConfig,
}

impl StepRunner {
    pub fn new(
        perception: Arc<dyn PerceptionLayer>,
        engine: Arc<dyn DecisionEngine>,
        executor: ActionExecutor,
    ) -> Self {
        Self::with_parts(perception, engine, executor, RuntimeConfig::default())
    }

    fn with_parts(
        perception: Arc<dyn PerceptionLayer>,
        engine: Arc<dyn DecisionEngine>,
        executor: ActionExecutor,
        config: RuntimeConfig,
    ) -> Self {
        let enforcer = if config.strict_tool_args {
            DecisionEnforcer::new().with_catalog(ToolCatalog::builtin())
        } else {
            DecisionEnforcer::new()
        };
        Self {
            perception,
            engine,
            executor,
            enforcer,
            memory: MemoryComposer::new(config.memory_context_limit),
            config,
        }
    }

    pub fn with_config(self, config: RuntimeConfig) -> Self {
        Self::with_parts(self.perception, self.engine, self.executor, config)
    }

    pub fn with_enforcer(mut self, enforcer: DecisionEnforcer) -> Self {
        self.enforcer = enforcer;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[instrument(skip_all, fields(step = %goal.step_key()))]
    pub async fn run(&self, goal: &TaskGoal) -> Result<StepReport> {
        GoalValidator.validate(goal).into_result()?;

        let started = Instant::now();
        let mut cycles: Vec<CycleRecord> = Vec::new();
        let mut memory_context = String::new();
        let mut feedback: Option<ActionFeedback> = None;

        let outcome = loop {
            if let Some(limit) = self.exhausted(goal, started, cycles.len()) {
                warn!(?limit, cycles = cycles.len(), "step budget exhausted");
                break StepOutcome::BudgetExhausted { limit };
            }
            let cycle = cycles.len() as u32 + 1;

            let perceived = self
                .perception
                .observe(ObservationRequest {
                    step: goal.step_key(),
                    cycle,
                    feedback: feedback.clone(),
                    memory_context: memory_context.clone(),
                })
                .await?;
            if !perceived.carries(feedback.as_ref(), &memory_context) {
                warn!(
                    cycle,
                    perceived_feedback = perceived.last_action_feedback.is_some(),
                    perceived_memory_chars = perceived.memory_context.chars().count(),
                    "observation lost feedback or memory, restoring"
                );
            }
            let observation = perceived.with_feedback(feedback.take(), memory_context.as_str());
            let verdict = ObservationChecker.check(&observation, cycle == 1);
            if !verdict.is_valid() {
                warn!(
                    cycle,
                    violations = ?verdict.violations(),
                    "inconsistent observation"
                );
            }

            let proposed = self.engine.decide(goal, &observation).await?;
            let action = self.enforcer.validate(goal, proposed)?;

            let mut executions = Vec::new();
            let mut report = self.executor.execute(action.clone()).await?;
            while action.on_failure_action == FailurePolicy::RetrySame
                && !report.succeeded()
                && (executions.len() as u32) < self.config.max_same_retries
            {
                info!(
                    cycle,
                    replay = executions.len() + 1,
                    tool = %action.tool_name,
                    "replaying identical action"
                );
                executions.push(report);
                report = self.executor.execute(action.clone()).await?;
            }
            let last = report.feedback.clone();
            executions.push(report);

            memory_context = self.memory.fold(&memory_context, cycle, &action, &last);

            let succeeded = last.is_success();
            let policy = action.on_failure_action.clone();
            cycles.push(CycleRecord {
                cycle,
                action,
                executions,
                observation_consistent: verdict.is_valid(),
            });

            if succeeded {
                break StepOutcome::Completed;
            }

            warn!(
                cycle,
                status = %last.status,
                error_code = %last.error_code,
                message = %last.message,
                policy = %policy,
                "action settled without success"
            );
            match policy {
                FailurePolicy::Abort => break StepOutcome::Aborted,
                FailurePolicy::Escalate => break StepOutcome::Escalated,
                FailurePolicy::ReEvaluate | FailurePolicy::RetrySame => {}
                FailurePolicy::Other(raw) => {
                    warn!(policy = %raw, "unknown failure policy, re-evaluating");
                }
            }
            feedback = Some(last);
        };

        info!(outcome = ?outcome, cycles = cycles.len(), "step finished");
        Ok(StepReport {
            step: goal.step_key(),
            outcome,
            cycles,
            memory_context,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn exhausted(&self, goal: &TaskGoal, started: Instant, cycles: usize) -> Option<BudgetLimit> {
        if cycles >= self.config.max_cycles_per_step as usize {
            return Some(BudgetLimit::MaxCycles);
        }
        if goal
            .step_budget()
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            return Some(BudgetLimit::StepTime);
        }
        if goal.deadline_elapsed(&UtcTimestamp::now()) {
            return Some(BudgetLimit::TaskDeadline);
        }
        None
    }
}

/// 并发运行互不相关的步骤，每步一个 runner 与浏览器会话
pub async fn run_steps_concurrently(
    jobs: Vec<(Arc<StepRunner>, TaskGoal)>,
) -> Vec<Result<StepReport>> {
    join_all(
        jobs.into_iter()
            .map(|(runner, goal)| async move { runner.run(&goal).await }),
    )
    .await
}
