use crate::{
    auth::Viewer,
    errors::{AppError, AppResult},
    models::domain::QuizAttempt,
};

pub fn require_owner(viewer: &Viewer, attempt: &QuizAttempt) -> AppResult<()> {
    if viewer.user_id != attempt.user_id {
        return Err(AppError::Unauthorized(
            "You can only change your own attempts".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner_or_staff(viewer: &Viewer, attempt: &QuizAttempt) -> AppResult<()> {
    if !viewer.role.is_staff() && viewer.user_id != attempt.user_id {
        return Err(AppError::Unauthorized(
            "You can only view your own attempts".to_string(),
        ));
    }
    Ok(())
}
