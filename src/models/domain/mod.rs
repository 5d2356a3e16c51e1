pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod user;
pub use quiz::{Quiz, ShowCorrectAnswers};
pub use quiz_attempt::{AttemptAnswer, QuizAttempt};
pub use quiz_question::{Choice, Question, QuestionKind};
pub use user::UserRole;
