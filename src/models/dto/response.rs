use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{QuestionKind, Quiz, QuizAttempt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub question_id: String,
    pub user_answer: String,
    /// Only present once the attempt is graded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectAnswer {
    #[serde(rename_all = "camelCase")]
    MultipleChoice { correct_option_id: String },
    #[serde(rename_all = "camelCase")]
    TrueFalse { correct_answer: bool },
    #[serde(rename_all = "camelCase")]
    FillInBlank { possible_answers: Vec<String> },
}

impl From<&QuestionKind> for CorrectAnswer {
    fn from(kind: &QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice {
                correct_option_id, ..
            } => CorrectAnswer::MultipleChoice {
                correct_option_id: correct_option_id.clone(),
            },
            QuestionKind::TrueFalse { correct_answer } => CorrectAnswer::TrueFalse {
                correct_answer: *correct_answer,
            },
            QuestionKind::FillInBlank { possible_answers } => CorrectAnswer::FillInBlank {
                possible_answers: possible_answers.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_id: String,
    pub points: u32,
    #[serde(flatten)]
    pub answer: CorrectAnswer,
}

/// Client-facing projection of an attempt.
///
/// Correctness and score stay hidden while the attempt is open. The answer key
/// is attached only for sealed attempts whose viewer may see it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptView {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    pub answers: Vec<AnswerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<Vec<AnswerKeyEntry>>,
}

impl AttemptView {
    pub fn build(attempt: &QuizAttempt, quiz: &Quiz, reveal_answers: bool, now: DateTime<Utc>) -> Self {
        let sealed = attempt.is_sealed();

        let answers = attempt
            .answers
            .iter()
            .map(|a| AnswerView {
                question_id: a.question_id.clone(),
                user_answer: a.user_answer.clone(),
                is_correct: sealed.then_some(a.is_correct),
            })
            .collect();

        let answer_key = (sealed && reveal_answers).then(|| {
            quiz.questions
                .iter()
                .map(|q| AnswerKeyEntry {
                    question_id: q.id.clone(),
                    points: q.points,
                    answer: CorrectAnswer::from(&q.kind),
                })
                .collect()
        });

        AttemptView {
            id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            user_id: attempt.user_id.clone(),
            attempt_number: attempt.attempt_number,
            status: if sealed {
                AttemptStatus::Submitted
            } else {
                AttemptStatus::InProgress
            },
            start_time: attempt.start_time,
            end_time: attempt.end_time,
            total_points: attempt.total_points,
            score: sealed.then_some(attempt.score),
            correct_count: sealed.then(|| attempt.correct_count()),
            remaining_seconds: if sealed {
                None
            } else {
                attempt.remaining(quiz, now).map(|d| d.num_seconds())
            },
            answers,
            answer_key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: String,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub total_points: u32,
    pub latest: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptHistoryResponse {
    pub quiz_id: String,
    pub attempts: Vec<AttemptSummary>,
}

impl AttemptHistoryResponse {
    /// `latest` marks the most recent sealed attempt.
    pub fn new(quiz_id: &str, attempts: &[QuizAttempt]) -> Self {
        let latest_sealed = attempts
            .iter()
            .filter(|a| a.is_sealed())
            .map(|a| a.attempt_number)
            .max();
        let attempts = attempts
            .iter()
            .map(|a| AttemptSummary {
                id: a.id.clone(),
                attempt_number: a.attempt_number,
                status: if a.is_sealed() {
                    AttemptStatus::Submitted
                } else {
                    AttemptStatus::InProgress
                },
                start_time: a.start_time,
                end_time: a.end_time,
                score: a.is_sealed().then_some(a.score),
                total_points: a.total_points,
                latest: a.is_sealed() && Some(a.attempt_number) == latest_sealed,
            })
            .collect();

        AttemptHistoryResponse {
            quiz_id: quiz_id.to_string(),
            attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub quiz_id: String,
    pub can_reveal_answers: bool,
}
