use crate::models::domain::{AttemptAnswer, Question, QuestionKind, Quiz, QuizAttempt};

/// Result of grading every question of a quiz against one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAttempt {
    pub answers: Vec<AttemptAnswer>,
    pub score: u32,
    pub total_points: u32,
}

pub struct GradingEngine;

impl GradingEngine {
    /// All-or-nothing correctness of a single submitted answer.
    pub fn grade(question: &Question, user_answer: &str) -> bool {
        match &question.kind {
            QuestionKind::MultipleChoice {
                correct_option_id, ..
            } => user_answer == correct_option_id,
            QuestionKind::TrueFalse { correct_answer } => match user_answer {
                "true" => *correct_answer,
                "false" => !*correct_answer,
                _ => false,
            },
            QuestionKind::FillInBlank { possible_answers } => {
                let submitted = normalize(user_answer);
                if submitted.is_empty() {
                    return false;
                }
                possible_answers
                    .iter()
                    .any(|accepted| normalize(accepted) == submitted)
            }
        }
    }

    pub fn points_for(question: &Question, user_answer: &str) -> u32 {
        if Self::grade(question, user_answer) {
            question.points
        } else {
            0
        }
    }

    /// Grades every quiz question against the attempt's recorded answers.
    ///
    /// Recorded answers keep their insertion order; questions never answered
    /// are appended as empty, incorrect answers in quiz order.
    pub fn grade_attempt(quiz: &Quiz, attempt: &QuizAttempt) -> GradedAttempt {
        let mut answers = Vec::with_capacity(quiz.questions.len());
        let mut score = 0u32;

        for recorded in &attempt.answers {
            let Some(question) = quiz.question(&recorded.question_id) else {
                log::warn!(
                    "Attempt {} has an answer for unknown question {}",
                    attempt.id,
                    recorded.question_id
                );
                continue;
            };
            let points = Self::points_for(question, &recorded.user_answer);
            score = score.saturating_add(points);
            answers.push(AttemptAnswer {
                question_id: recorded.question_id.clone(),
                user_answer: recorded.user_answer.clone(),
                is_correct: points > 0,
            });
        }

        for question in &quiz.questions {
            if attempt.answer_for(&question.id).is_none() {
                answers.push(AttemptAnswer {
                    question_id: question.id.clone(),
                    user_answer: String::new(),
                    is_correct: Self::grade(question, ""),
                });
            }
        }

        GradedAttempt {
            answers,
            score,
            total_points: quiz.total_points(),
        }
    }
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}
