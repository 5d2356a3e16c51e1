use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAttempt},
};

/// What a caller needs to know before offering "Start quiz".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptEligibility {
    pub can_start: bool,
    pub remaining_attempts: u32,
    pub max_attempts: u32,
    pub sealed_attempts: u32,
    pub open_attempt_id: Option<String>,
}

pub struct AttemptCountPolicy;

impl AttemptCountPolicy {
    /// Sealed attempts by `user_id` on `quiz`; open attempts are not counted.
    pub fn sealed_count(user_id: &str, quiz: &Quiz, past_attempts: &[QuizAttempt]) -> u32 {
        past_attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz.id && a.is_sealed())
            .count() as u32
    }

    pub fn can_start_new_attempt(user_id: &str, quiz: &Quiz, past_attempts: &[QuizAttempt]) -> bool {
        Self::sealed_count(user_id, quiz, past_attempts) < quiz.max_attempts
    }

    pub fn remaining_attempts(user_id: &str, quiz: &Quiz, past_attempts: &[QuizAttempt]) -> u32 {
        quiz.max_attempts
            .saturating_sub(Self::sealed_count(user_id, quiz, past_attempts))
    }

    pub fn eligibility(
        user_id: &str,
        quiz: &Quiz,
        past_attempts: &[QuizAttempt],
        open_attempt: Option<&QuizAttempt>,
    ) -> AttemptEligibility {
        let sealed_attempts = Self::sealed_count(user_id, quiz, past_attempts);
        AttemptEligibility {
            can_start: open_attempt.is_none()
                && Self::can_start_new_attempt(user_id, quiz, past_attempts),
            remaining_attempts: Self::remaining_attempts(user_id, quiz, past_attempts),
            max_attempts: quiz.max_attempts,
            sealed_attempts,
            open_attempt_id: open_attempt.map(|a| a.id.clone()),
        }
    }

    /// Published and inside its availability window.
    pub fn check_availability(quiz: &Quiz, now: DateTime<Utc>) -> AppResult<()> {
        if !quiz.published {
            return Err(AppError::QuizUnavailable(format!(
                "Quiz '{}' is not published",
                quiz.id
            )));
        }
        if let Some(from) = quiz.available_from {
            if now < from {
                return Err(AppError::QuizUnavailable(format!(
                    "Quiz '{}' is not available until {}",
                    quiz.id,
                    from.to_rfc3339()
                )));
            }
        }
        if let Some(until) = quiz.available_until {
            if now > until {
                return Err(AppError::QuizUnavailable(format!(
                    "Quiz '{}' closed at {}",
                    quiz.id,
                    until.to_rfc3339()
                )));
            }
        }
        Ok(())
    }
}
