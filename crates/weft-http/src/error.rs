//! HTTP error type.
//!
//! [`HttpError`] carries the status code a failed operation should answer
//! with, plus an optional internal cause. The cause is meant for logs only:
//! the response body never includes it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error carrying an HTTP status code and an optional internal cause.
#[derive(Debug)]
pub struct HttpError {
    /// Status code to answer with.
    pub status: StatusCode,
    internal: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HttpError {
    /// Create an error with a status code and no internal cause.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            internal: None,
        }
    }

    /// Create an error with a status code and an internal cause.
    #[must_use]
    pub fn with_internal(
        status: StatusCode,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            status,
            internal: Some(err.into()),
        }
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// Create a 500 Internal Server Error wrapping `err`.
    #[must_use]
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::with_internal(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    /// The internal cause, if any.
    #[must_use]
    pub fn internal_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.internal.as_deref()
    }

    /// Status line text, e.g. `404 Not Found`.
    fn status_text(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {reason}", self.status.as_u16()),
            None => self.status.as_u16().to_string(),
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status_text())?;
        if let Some(internal) = &self.internal {
            write!(f, ": {internal}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.internal
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        if let Some(internal) = &self.internal {
            if self.status.is_server_error() {
                tracing::error!(status = self.status.as_u16(), error = %internal, "Request failed");
            } else {
                tracing::debug!(status = self.status.as_u16(), error = %internal, "Request failed");
            }
        }
        (self.status, self.status_text()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_internal() {
        let err = HttpError::not_found();

        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn test_display_with_internal() {
        let err = HttpError::internal(std::io::Error::other("disk on fire"));

        assert_eq!(err.to_string(), "500 Internal Server Error: disk on fire");
    }

    #[test]
    fn test_source_exposes_internal() {
        use std::error::Error;

        let err = HttpError::internal(std::io::Error::other("boom"));

        assert_eq!(err.source().unwrap().to_string(), "boom");
        assert!(HttpError::not_found().source().is_none());
    }

    #[test]
    fn test_into_response_hides_internal() {
        let response = HttpError::internal(std::io::Error::other("secret path")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_status_code() {
        let err: HttpError = StatusCode::FORBIDDEN.into();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.internal_error().is_none());
    }
}
