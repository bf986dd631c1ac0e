// 控制循环模块
//
// 观察 → 决策 → 校验 → 执行 → 折叠反馈 → 再观察

mod memory;
mod step;

pub use memory::MemoryComposer;
pub use step::{
    run_steps_concurrently, BudgetLimit, CycleRecord, StepOutcome, StepReport, StepRunner,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{ActionFeedback, DecisionAction, StepKey, TaskGoal, WebObservation};

/// 每轮向感知层发出的请求
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationRequest {
    pub step: StepKey,
    /// 步内轮次，从 1 开始
    pub cycle: u32,
    /// 上一动作的反馈，首轮为空
    pub feedback: Option<ActionFeedback>,
    pub memory_context: String,
}

/// 浏览器状态采样，由浏览器驱动侧实现
#[async_trait]
pub trait PerceptionLayer: Send + Sync {
    async fn observe(&self, request: ObservationRequest) -> Result<WebObservation>;
}

/// 每轮选出一个动作，输出不可信
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(&self, goal: &TaskGoal, observation: &WebObservation)
        -> Result<DecisionAction>;
}
