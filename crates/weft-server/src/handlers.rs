//! Request handlers for template pages and static files.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;
use weft_http::{HttpError, RequestMeta, send_template};

use crate::state::AppState;

/// Template rendered for `GET /`.
const INDEX_TEMPLATE: &str = "index.html";

/// Request details handed to page templates.
#[derive(Debug, Serialize)]
struct PageRequest {
    /// Template being rendered.
    name: String,
    /// Request method.
    method: String,
    /// Request path.
    path: String,
    /// Raw query string, if any.
    query: Option<String>,
}

/// Handle GET /.
pub(crate) async fn get_index(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, HttpError> {
    render_page(state, INDEX_TEMPLATE.to_owned(), &method, &uri).await
}

/// Handle GET /{name}.
pub(crate) async fn get_page(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response, HttpError> {
    render_page(state, name, &method, &uri).await
}

/// Handle GET {prefix}/{*path}.
pub(crate) async fn get_static(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let request = RequestMeta::new(method, headers);
    let files = Arc::clone(&state.files);

    tokio::task::spawn_blocking(move || files.send_file(&request, &path))
        .await
        .map_err(HttpError::internal)?
}

async fn render_page(
    state: Arc<AppState>,
    name: String,
    method: &Method,
    uri: &Uri,
) -> Result<Response, HttpError> {
    let templates = Arc::clone(&state.templates);
    if !templates.snapshot().contains(&name) {
        tracing::debug!(name, "No such page template");
        return Err(HttpError::not_found());
    }

    let page = PageRequest {
        name,
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
    };

    tokio::task::spawn_blocking(move || {
        send_template(StatusCode::OK, &templates, &page.name, &page)
    })
    .await
    .map_err(HttpError::internal)?
}
