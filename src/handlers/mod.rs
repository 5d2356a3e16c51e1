pub mod health_handler;
pub mod quiz_attempt_handler;

use actix_web::web;

use crate::errors::AppError;

pub use health_handler::{health_check, health_check_ready};
pub use quiz_attempt_handler::{
    answers_visible, attempt_eligibility, attempt_history, get_attempt, record_answer,
    resume_attempt, start_attempt, submit_attempt,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into());

    cfg.app_data(json_config)
        .service(health_check)
        .service(health_check_ready)
        .service(start_attempt)
        .service(resume_attempt)
        .service(attempt_history)
        .service(attempt_eligibility)
        .service(answers_visible)
        .service(record_answer)
        .service(submit_attempt)
        .service(get_attempt);
}
