//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router.
///
/// `static_prefix` must start with `/` and not end with one.
pub(crate) fn create_router(state: Arc<AppState>, static_prefix: &str) -> Router {
    Router::new()
        .route("/", get(handlers::get_index))
        .route("/{name}", get(handlers::get_page))
        .route(&format!("{static_prefix}/{{*path}}"), get(handlers::get_static))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
