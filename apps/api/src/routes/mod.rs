pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::sheet::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/generate_gabarito", post(handlers::handle_generate))
        .route(
            "/position_maps/:id",
            get(handlers::handle_get_position_map),
        )
        .route("/sheets/:id", delete(handlers::handle_delete_sheet))
        .route("/grade", post(handlers::handle_grade))
        .with_state(state)
}
