pub mod answer;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::state::AppState;

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();
    Router::new()
        .route("/get_answer", post(answer::get_answer))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
