pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/health", get(routes::health))
        .route("/detect", post(routes::detect))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
