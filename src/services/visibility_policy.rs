use chrono::{DateTime, Utc};

use crate::{
    models::domain::{Quiz, QuizAttempt, ShowCorrectAnswers, UserRole},
    services::attempt_policy::AttemptCountPolicy,
};

pub struct VisibilityPolicy;

impl VisibilityPolicy {
    /// Whether correct answers may be disclosed to this viewer right now.
    ///
    /// Staff always see answers. A student sees them once they have no
    /// attempts left, or when the quiz's disclosure setting allows it.
    pub fn can_reveal_answers(
        role: UserRole,
        quiz: &Quiz,
        user_id: &str,
        past_attempts: &[QuizAttempt],
        now: DateTime<Utc>,
    ) -> bool {
        if role.is_staff() {
            return true;
        }

        if !AttemptCountPolicy::can_start_new_attempt(user_id, quiz, past_attempts) {
            return true;
        }

        match quiz.show_correct_answers {
            ShowCorrectAnswers::Never => false,
            ShowCorrectAnswers::Immediately => true,
            // no due date means the date never passes
            ShowCorrectAnswers::AfterDueDate => quiz.due_date.is_some_and(|due| now > due),
        }
    }
}
