// 执行图与计划驱动

mod driver;
mod graph;
mod node;

pub use driver::{CorrectionRequest, FailureRecord, PlanDriver, PlanOutcome, PlanReport, Replanner};
pub use graph::{load_plan_file, DynamicReference, ExecutionGraph, GraphError, GraphSummary};
pub use node::{ExecutionNode, NodeStatus, DEFAULT_NODE_PRIORITY, DEFAULT_PRECONDITION};
