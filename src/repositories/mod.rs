pub mod quiz_attempt_repository;
pub mod quiz_repository;

pub use quiz_attempt_repository::{
    InMemoryQuizAttemptRepository, MongoQuizAttemptRepository, QuizAttemptRepository,
};
pub use quiz_repository::{InMemoryQuizRepository, MongoQuizRepository, QuizRepository};
