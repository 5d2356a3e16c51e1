use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::app_state::AppState;

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
pub async fn health_check_ready(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let Some(db) = &state.db else {
        return HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": { "storage": "memory" }
        }));
    };

    let db_health = db.health_check().await;
    let response = serde_json::json!({
        "status": if db_health.is_ok() { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "mongodb": if db_health.is_ok() { "ok" } else { "error" },
            "database": db.name()
        }
    });

    if db_health.is_ok() {
        HttpResponse::Ok().json(response)
    } else {
        log::warn!("Readiness check failed: {:?}", db_health.err());
        HttpResponse::ServiceUnavailable().json(response)
    }
}
