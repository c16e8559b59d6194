use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Servidor do Gerador de Gabarito está online!"
    }))
}

/// GET /health
/// Returns a simple status object with service version and limits.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "gabarito-api",
        "max_questions": state.config.max_questions,
        "grading": state.grader.is_some()
    }))
}
