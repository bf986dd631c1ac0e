pub mod cli;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod model;
pub mod plan;
pub mod runtime;
pub mod tools;
pub mod utils;

pub use config::{EnvConfig, RuntimeConfig};
pub use contract::{
    ContractViolation, DecisionEnforcer, EnforcementError, GoalValidator, ObservationChecker,
    Verdict,
};
pub use engine::{
    run_steps_concurrently, DecisionEngine, MemoryComposer, ObservationRequest, PerceptionLayer,
    StepOutcome, StepReport, StepRunner,
};
pub use error::{Result, WebAgentError};
pub use model::{
    ActionFeedback, BoundingBox, BrowserHealth, DecisionAction, DynamicData, ErrorCode,
    FailurePolicy, FeedbackStatus, KeyElement, StepKey, TaskGoal, UtcTimestamp, WebObservation,
};
pub use plan::{
    load_plan_file, ExecutionGraph, ExecutionNode, GraphError, NodeStatus, PlanDriver,
    PlanOutcome, PlanReport, Replanner,
};
pub use runtime::{ActionExecutor, AttemptState, AttemptTracker, ExecutionReport};
pub use tools::{
    BrowserTool, ToolCatalog, ToolFailure, ToolInvocation, ToolOutput, ToolRegistry, ToolSpec,
};
pub use utils::{logging, validation};
