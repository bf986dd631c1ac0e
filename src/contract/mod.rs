mod enforcer;
mod goal_validator;
mod observation_checker;
mod violation;

pub use enforcer::{DecisionEnforcer, EnforcementError, CONFIDENCE_RANGE};
pub use goal_validator::{GoalValidator, PRIORITY_RANGE};
pub use observation_checker::{ObservationChecker, HTTP_STATUS_RANGE};
pub use violation::{ContractViolation, Verdict};
