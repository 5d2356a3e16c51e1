use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quiz '{0}' has no questions")]
    EmptyQuiz(String),

    #[error("Attempt already in progress: {0}")]
    AttemptInProgress(String),

    #[error("Attempt limit reached: {0}")]
    AttemptLimitReached(String),

    #[error("Attempt '{0}' has already been submitted")]
    AlreadySubmitted(String),

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Quiz unavailable: {0}")]
    QuizUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::EmptyQuiz(_) => "EMPTY_QUIZ",
            AppError::AttemptInProgress(_) => "ATTEMPT_IN_PROGRESS",
            AppError::AttemptLimitReached(_) => "ATTEMPT_LIMIT_REACHED",
            AppError::AlreadySubmitted(_) => "ALREADY_SUBMITTED",
            AppError::StorageConflict(_) => "STORAGE_CONFLICT",
            AppError::QuizUnavailable(_) => "QUIZ_UNAVAILABLE",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyQuiz(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AttemptInProgress(_) => StatusCode::CONFLICT,
            AppError::AttemptLimitReached(_) => StatusCode::CONFLICT,
            AppError::AlreadySubmitted(_) => StatusCode::CONFLICT,
            AppError::StorageConflict(_) => StatusCode::CONFLICT,
            AppError::QuizUnavailable(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            kind: self.error_code(),
            code: self.status_code().as_u16(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}
impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("Malformed JSON: {}", err))
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
