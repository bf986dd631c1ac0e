// 运行时执行模块

mod executor;
mod state;
mod types;

pub use executor::ActionExecutor;
pub use state::{AttemptState, AttemptTracker, AttemptTransition};
pub use types::ExecutionReport;
