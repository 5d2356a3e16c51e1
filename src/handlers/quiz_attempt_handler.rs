use std::sync::Arc;

use actix_web::{get, post, put, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{require_owner, require_owner_or_staff, Viewer},
    errors::{AppError, AppResult},
    models::{
        domain::QuizAttempt,
        dto::{
            request::RecordAnswerRequest,
            response::{AttemptHistoryResponse, AttemptView, RevealResponse},
        },
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Staff may look at another user's history.
    pub user_id: Option<String>,
}

async fn render(state: &AppState, viewer: &Viewer, attempt: &QuizAttempt) -> AppResult<AttemptView> {
    let service = &state.quiz_attempt_service;
    let quiz = service.get_quiz(&attempt.quiz_id).await?;
    let reveal = attempt.is_sealed()
        && service
            .can_reveal_answers(viewer.role, &attempt.user_id, &attempt.quiz_id)
            .await?;
    Ok(AttemptView::build(attempt, &quiz, reveal, service.now()))
}

#[post("/api/quizzes/{quiz_id}/attempts")]
pub async fn start_attempt(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let attempt = state
        .quiz_attempt_service
        .start(&viewer.user_id, &quiz_id)
        .await?;
    let view = render(&state, &viewer, &attempt).await?;
    Ok(HttpResponse::Created().json(view))
}

#[get("/api/quizzes/{quiz_id}/attempts/open")]
pub async fn resume_attempt(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    match state
        .quiz_attempt_service
        .resume(&viewer.user_id, &quiz_id)
        .await?
    {
        Some(attempt) => {
            let view = render(&state, &viewer, &attempt).await?;
            Ok(HttpResponse::Ok().json(view))
        }
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

#[get("/api/quizzes/{quiz_id}/attempts")]
pub async fn attempt_history(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    query: web::Query<HistoryParams>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let user_id = match query.into_inner().user_id {
        Some(other) if other != viewer.user_id => {
            if !viewer.role.is_staff() {
                return Err(AppError::Unauthorized(
                    "Only staff can view another user's attempts".to_string(),
                ));
            }
            other
        }
        _ => viewer.user_id.clone(),
    };

    let attempts = state
        .quiz_attempt_service
        .history(&user_id, &quiz_id)
        .await?;
    Ok(HttpResponse::Ok().json(AttemptHistoryResponse::new(&quiz_id, &attempts)))
}

#[get("/api/quizzes/{quiz_id}/eligibility")]
pub async fn attempt_eligibility(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let eligibility = state
        .quiz_attempt_service
        .eligibility(&viewer.user_id, &quiz_id)
        .await?;
    Ok(HttpResponse::Ok().json(eligibility))
}

#[get("/api/quizzes/{quiz_id}/answers-visible")]
pub async fn answers_visible(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let can_reveal_answers = state
        .quiz_attempt_service
        .can_reveal_answers(viewer.role, &viewer.user_id, &quiz_id)
        .await?;
    Ok(HttpResponse::Ok().json(RevealResponse {
        quiz_id: quiz_id.into_inner(),
        can_reveal_answers,
    }))
}

#[put("/api/attempts/{attempt_id}/answers")]
pub async fn record_answer(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    request: web::Json<RecordAnswerRequest>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let service = &state.quiz_attempt_service;
    let attempt = service.get_attempt(&attempt_id).await?;
    require_owner(&viewer, &attempt)?;

    let updated = service
        .record_answer(&attempt_id, &request.question_id, &request.user_answer)
        .await?;
    let view = render(&state, &viewer, &updated).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/api/attempts/{attempt_id}/submit")]
pub async fn submit_attempt(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let service = &state.quiz_attempt_service;
    let attempt = service.get_attempt(&attempt_id).await?;
    require_owner(&viewer, &attempt)?;

    let sealed = service.submit(&attempt_id).await?;
    let view = render(&state, &viewer, &sealed).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/api/attempts/{attempt_id}")]
pub async fn get_attempt(
    state: web::Data<Arc<AppState>>,
    attempt_id: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    let service = &state.quiz_attempt_service;
    let attempt = service.get_attempt(&attempt_id).await?;
    require_owner_or_staff(&viewer, &attempt)?;

    let attempt = service.view_attempt(&attempt_id).await?;
    let view = render(&state, &viewer, &attempt).await?;
    Ok(HttpResponse::Ok().json(view))
}
