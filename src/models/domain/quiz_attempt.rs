use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::Quiz;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt_number: u32,
    pub start_time: DateTime<Utc>,
    /// Set exactly once, when the attempt is sealed.
    pub end_time: Option<DateTime<Utc>>,
    pub score: u32,
    pub total_points: u32,
    pub answers: Vec<AttemptAnswer>,
    /// Bumped by the repository on every successful save.
    #[serde(default)]
    pub revision: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAnswer {
    pub question_id: String,
    pub user_answer: String,
    /// Placeholder until the attempt is sealed.
    pub is_correct: bool,
}

impl QuizAttempt {
    pub fn open(user_id: &str, quiz: &Quiz, attempt_number: u32, now: DateTime<Utc>) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            user_id: user_id.to_string(),
            attempt_number,
            start_time: now,
            end_time: None,
            score: 0,
            total_points: quiz.total_points(),
            answers: Vec::new(),
            revision: 0,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| a.user_answer.as_str())
    }

    /// Replaces the answer for `question_id` in place, or appends it.
    pub fn upsert_answer(&mut self, question_id: &str, user_answer: &str) {
        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(existing) => existing.user_answer = user_answer.to_string(),
            None => self.answers.push(AttemptAnswer {
                question_id: question_id.to_string(),
                user_answer: user_answer.to_string(),
                is_correct: false,
            }),
        }
    }

    pub fn seal(&mut self, graded: Vec<AttemptAnswer>, score: u32, now: DateTime<Utc>) {
        self.answers = graded;
        self.score = score;
        self.end_time = Some(now);
    }

    pub fn has_expired(&self, quiz: &Quiz, now: DateTime<Utc>) -> bool {
        match quiz.deadline_for(self.start_time) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Time left on a timed attempt, recomputed from `start_time`.
    pub fn remaining(&self, quiz: &Quiz, now: DateTime<Utc>) -> Option<Duration> {
        quiz.deadline_for(self.start_time)
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }

    pub fn correct_count(&self) -> usize {
        if !self.is_sealed() {
            return 0;
        }
        self.answers.iter().filter(|a| a.is_correct).count()
    }
}
