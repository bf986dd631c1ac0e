pub mod action;
pub mod dynamic;
pub mod feedback;
pub mod goal;
pub mod observation;
pub mod timestamp;

pub use action::{DecisionAction, FailurePolicy};
pub use dynamic::DynamicData;
pub use feedback::{codes, ActionFeedback, ErrorCode, FeedbackStatus};
pub use goal::{StepKey, TaskGoal};
pub use observation::{BoundingBox, BrowserHealth, KeyElement, ObservationBuilder, WebObservation};
pub use timestamp::UtcTimestamp;
