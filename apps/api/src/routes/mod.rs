pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Vocabulary
        .route("/api/v1/skills", get(handlers::handle_vocabulary_info))
        .route(
            "/api/v1/skills/extract",
            post(handlers::handle_extract_skills),
        )
        // Scoring
        .route("/api/v1/score", post(handlers::handle_score_upload))
        .route("/api/v1/score/text", post(handlers::handle_score_text))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
