use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordAnswerRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,

    /// Stored verbatim; grading normalizes it at submit time.
    #[validate(length(max = 10000))]
    pub user_answer: String,
}
