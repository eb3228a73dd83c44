pub mod health;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};

use crate::analyze::handlers;
use crate::analyze::validation::MAX_FILE_BYTES;
use crate::auth;
use crate::state::AppState;

/// Slack above the upload limit so an oversized file still reaches the
/// handler's own 413 instead of being cut off mid-stream by the extractor.
const BODY_LIMIT_BYTES: usize = MAX_FILE_BYTES + 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let analyze = Router::new()
        .route(
            "/api/analyze",
            get(handlers::handle_capabilities).post(handlers::handle_analyze),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(analyze)
        .with_state(state)
}
