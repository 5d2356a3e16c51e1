pub mod attempt_locks;
pub mod attempt_policy;
pub mod attempt_timer;
pub mod clock;
pub mod grading;
pub mod quiz_attempt_service;
pub mod visibility_policy;

pub use attempt_policy::{AttemptCountPolicy, AttemptEligibility};
pub use clock::{Clock, SystemClock};
pub use grading::{GradedAttempt, GradingEngine};
pub use quiz_attempt_service::QuizAttemptService;
pub use visibility_policy::VisibilityPolicy;
