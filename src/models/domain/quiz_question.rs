use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "questionText", alias = "question")]
    pub prompt: String,
    #[validate(range(
        min = 1,
        max = 10_000,
        message = "Question points must be between 1 and 10000"
    ))]
    pub points: u32,
    #[serde(flatten)]
    #[validate(custom(function = "validate_question_kind"))]
    pub kind: QuestionKind,
}

/// Correctness rule of a question, tagged by its `type`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        choices: Vec<Choice>,
        correct_option_id: String,
    },
    #[serde(rename_all = "camelCase")]
    TrueFalse { correct_answer: bool },
    #[serde(rename_all = "camelCase")]
    FillInBlank { possible_answers: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}


fn validate_question_kind(kind: &QuestionKind) -> Result<(), ValidationError> {
    match kind {
        QuestionKind::MultipleChoice {
            choices,
            correct_option_id,
        } => {
            if choices.len() < 2 {
                return Err(ValidationError::new("too_few_choices")
                    .with_message("Multiple choice questions need at least two choices".into()));
            }
            let mut seen = HashSet::new();
            if !choices.iter().all(|c| seen.insert(c.id.as_str())) {
                return Err(ValidationError::new("duplicate_choice_id")
                    .with_message("Choice ids must be unique within a question".into()));
            }
            if !seen.contains(correct_option_id.as_str()) {
                return Err(ValidationError::new("dangling_correct_option")
                    .with_message("correctOptionId must reference one of the choices".into()));
            }
            Ok(())
        }
        QuestionKind::TrueFalse { .. } => Ok(()),
        QuestionKind::FillInBlank { possible_answers } => {
            if possible_answers.iter().all(|a| a.trim().is_empty()) {
                return Err(ValidationError::new("no_possible_answers")
                    .with_message("Fill in the blank questions need an acceptable answer".into()));
            }
            Ok(())
        }
    }
}
