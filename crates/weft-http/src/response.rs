//! Response builders for common payload kinds.

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use weft_templates::TemplateStore;

use crate::error::HttpError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// Redirect requested with a status outside the 3xx range.
#[derive(Debug, thiserror::Error)]
#[error("redirect status code should be in 3xx range, but was {0}")]
pub struct InvalidRedirectStatus(pub u16);

/// Respond with raw bytes and an explicit content type.
#[must_use]
pub fn send_blob(status: StatusCode, content_type: &str, data: impl Into<Body>) -> Response {
    let mut response = Response::new(data.into());
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Respond with `value` encoded as compact JSON.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] if `value` cannot be serialized.
pub fn send_json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response, HttpError> {
    let body = serde_json::to_vec(value).map_err(HttpError::internal)?;
    Ok(send_blob(status, JSON_CONTENT_TYPE, body))
}

/// Respond with `value` encoded as indented JSON.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] if `value` cannot be serialized.
pub fn send_json_pretty<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response, HttpError> {
    let body = serde_json::to_vec_pretty(value).map_err(HttpError::internal)?;
    Ok(send_blob(status, JSON_CONTENT_TYPE, body))
}

/// Respond with a redirect to `url`.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] if `status` is not a 3xx code or `url` is
/// not a valid header value.
pub fn send_redirect(status: StatusCode, url: &str) -> Result<Response, HttpError> {
    if !status.is_redirection() {
        return Err(HttpError::internal(InvalidRedirectStatus(status.as_u16())));
    }
    let location = HeaderValue::from_str(url).map_err(HttpError::internal)?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

/// Render template `name` with `data` and respond with the HTML.
///
/// The template is rendered into a buffer before the response is built,
/// so a failed render never produces a partial body.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] wrapping the render failure.
pub fn send_template<T: Serialize + ?Sized>(
    status: StatusCode,
    store: &TemplateStore,
    name: &str,
    data: &T,
) -> Result<Response, HttpError> {
    let mut body = Vec::new();
    store
        .render(&mut body, name, data)
        .map_err(HttpError::internal)?;
    Ok(send_blob(status, HTML_CONTENT_TYPE, body))
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use weft_templates::{Functions, TemplateSet};

    use super::*;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    fn store(sources: &[(&str, &str)]) -> TemplateStore {
        let set = TemplateSet::from_sources(sources.iter().copied(), &Functions::new()).unwrap();
        TemplateStore::from_set("templates", Functions::new(), set)
    }

    #[derive(Serialize)]
    struct Item {
        id: u32,
        name: &'static str,
    }

    #[tokio::test]
    async fn test_send_blob() {
        let response = send_blob(StatusCode::CREATED, "image/png", vec![1_u8, 2, 3]);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(content_type(&response), "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_send_json() {
        let item = Item { id: 7, name: "a" };

        let response = send_json(StatusCode::OK, &item).unwrap();

        assert_eq!(content_type(&response), "application/json; charset=UTF-8");
        assert_eq!(body_string(response).await, r#"{"id":7,"name":"a"}"#);
    }

    #[tokio::test]
    async fn test_send_json_pretty() {
        let item = Item { id: 7, name: "a" };

        let response = send_json_pretty(StatusCode::OK, &item).unwrap();

        assert_eq!(
            body_string(response).await,
            "{\n  \"id\": 7,\n  \"name\": \"a\"\n}"
        );
    }

    #[test]
    fn test_send_redirect() {
        let response = send_redirect(StatusCode::SEE_OTHER, "/login").unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn test_send_redirect_rejects_non_3xx() {
        let err = send_redirect(StatusCode::OK, "/login").unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "500 Internal Server Error: redirect status code should be in 3xx range, but was 200"
        );
    }

    #[test]
    fn test_send_redirect_rejects_invalid_url() {
        let err = send_redirect(StatusCode::FOUND, "/bad\nurl").unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_send_template() {
        let store = store(&[("page.html", "<h1>{{ this }}</h1>")]);

        let response = send_template(StatusCode::OK, &store, "page.html", "a&b").unwrap();

        assert_eq!(content_type(&response), "text/html; charset=UTF-8");
        assert_eq!(body_string(response).await, "<h1>a&amp;b</h1>");
    }

    #[test]
    fn test_send_template_failure_is_internal_error() {
        let store = store(&[("page.html", "{{ this.a.b }}")]);

        let err = send_template(StatusCode::OK, &store, "page.html", "x").unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_send_template_unknown_name() {
        let store = store(&[]);

        let err = send_template(StatusCode::OK, &store, "missing.html", "x").unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("missing.html"));
    }
}
