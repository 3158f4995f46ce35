//! Conditional response for a single OS path.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use axum::http::HeaderMap;
use axum::response::Response;
use weft_http::{HttpError, RequestMeta, serve_content};

use crate::dir::base_name;
use crate::store::open_error;

/// Build the response for the file at `path` under `request`'s conditions.
///
/// Unlike [`FileStore::send_file`](crate::FileStore::send_file) no `ETag`
/// is computed.
///
/// # Errors
///
/// Returns a 404 [`HttpError`] if `path` does not exist or is a directory,
/// and a 500 [`HttpError`] for any other I/O failure.
pub fn send_path(request: &RequestMeta, path: &Path) -> Result<Response, HttpError> {
    let file = fs::File::open(path).map_err(open_error)?;
    let metadata = file.metadata().map_err(HttpError::internal)?;
    if metadata.is_dir() {
        return Err(HttpError::not_found());
    }
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);

    serve_content(
        request,
        HeaderMap::new(),
        &base_name(path),
        modified,
        file,
    )
}
