use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_question::Question;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minutes allowed per attempt; `None` or `0` means untimed.
    #[serde(default, alias = "timeLimit")]
    pub time_limit_minutes: Option<u32>,
    #[serde(default = "default_max_attempts", alias = "attempts")]
    #[validate(range(min = 1, message = "A quiz must allow at least one attempt"))]
    pub max_attempts: u32,
    /// Kept for fixture compatibility; `max_attempts` is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_attempts_allowed: Option<bool>,
    #[serde(default)]
    pub show_correct_answers: ShowCorrectAnswers,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, alias = "questionList")]
    #[validate(nested)]
    pub questions: Vec<Question>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowCorrectAnswers {
    #[default]
    Never,
    Immediately,
    AfterDueDate,
}

fn default_max_attempts() -> u32 {
    1
}

impl Quiz {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::minutes(i64::from(minutes)))
    }

    /// Instant at which an attempt started at `start_time` expires.
    pub fn deadline_for(&self, start_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.time_limit().map(|limit| start_time + limit)
    }

    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// True when the legacy boolean contradicts `max_attempts`.
    pub fn has_inconsistent_attempt_flags(&self) -> bool {
        match self.multiple_attempts_allowed {
            Some(allowed) => allowed != (self.max_attempts > 1),
            None => false,
        }
    }

    /// Field-level validation plus the cross-question rules.
    pub fn check_definition(&self) -> AppResult<()> {
        self.validate()?;

        let mut ids = HashSet::new();
        if let Some(dup) = self.questions.iter().find(|q| !ids.insert(q.id.as_str())) {
            return Err(AppError::ValidationError(format!(
                "Quiz '{}' has duplicate question id '{}'",
                self.id, dup.id
            )));
        }

        let total = self
            .questions
            .iter()
            .try_fold(0u32, |total, q| total.checked_add(q.points));
        if total.is_none() {
            return Err(AppError::ValidationError(format!(
                "Quiz '{}' is worth more points than can be scored",
                self.id
            )));
        }

        if let (Some(from), Some(until)) = (self.available_from, self.available_until) {
            if until < from {
                return Err(AppError::ValidationError(format!(
                    "Quiz '{}' closes before it opens",
                    self.id
                )));
            }
        }

        Ok(())
    }
}
