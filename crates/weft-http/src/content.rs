//! Conditional content serving.
//!
//! [`serve_content`] answers a request from a seekable reader, handling
//! `If-Match`, `If-Unmodified-Since`, `If-None-Match`, `If-Modified-Since`,
//! `If-Range` and single byte ranges. Callers supply the metadata (name for
//! the content type, modification time, and optionally a pre-set `ETag`
//! header); this module never computes fingerprints itself.

use std::io::{self, Read, Seek, SeekFrom};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, Request, StatusCode, request};
use axum::response::Response;

use crate::error::HttpError;

/// Number of leading bytes inspected when sniffing a content type.
const SNIFF_LEN: usize = 512;

/// Size of the chunks a response body is read in.
const CHUNK_SIZE: usize = 64 * 1024;

/// The parts of a request that conditional serving looks at.
#[derive(Clone, Debug, Default)]
pub struct RequestMeta {
    /// Request method.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
}

impl RequestMeta {
    /// Create request metadata from a method and headers.
    #[must_use]
    pub fn new(method: Method, headers: HeaderMap) -> Self {
        Self { method, headers }
    }

    /// Add a header, ignoring values that are not valid header text.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn is_get_or_head(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

impl<B> From<&Request<B>> for RequestMeta {
    fn from(req: &Request<B>) -> Self {
        Self::new(req.method().clone(), req.headers().clone())
    }
}

impl From<&request::Parts> for RequestMeta {
    fn from(parts: &request::Parts) -> Self {
        Self::new(parts.method.clone(), parts.headers.clone())
    }
}

/// Serve `reader` as the response to `request`.
///
/// `headers` seeds the response headers; an `ETag` placed there takes part
/// in precondition and `If-Range` evaluation, and a `Content-Type` placed
/// there suppresses detection. Otherwise the content type comes from the
/// extension of `name`, falling back to sniffing the first bytes.
///
/// A `modified` time at the Unix epoch is treated as unknown: no
/// `Last-Modified` header is sent and date preconditions are ignored.
///
/// The body streams the selected bytes from `reader` in fixed-size chunks,
/// each read on the blocking pool, so it must be consumed inside a Tokio
/// runtime.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] if seeking or sniffing `reader` fails. Read
/// failures while streaming abort the body.
pub fn serve_content<R>(
    request: &RequestMeta,
    mut headers: HeaderMap,
    name: &str,
    modified: SystemTime,
    mut reader: R,
) -> Result<Response, HttpError>
where
    R: Read + Seek + Send + 'static,
{
    let modified_secs = unix_seconds(modified);
    if let Some(secs) = modified_secs
        && let Some(value) = format_http_date(secs)
    {
        headers.insert(header::LAST_MODIFIED, value);
    }

    let etag = headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let range_allowed = match evaluate_preconditions(request, etag.as_deref(), modified_secs) {
        Precondition::Failed => {
            return Ok(build(StatusCode::PRECONDITION_FAILED, headers, Body::empty()));
        }
        Precondition::NotModified => {
            headers.remove(header::CONTENT_TYPE);
            headers.remove(header::CONTENT_LENGTH);
            return Ok(build(StatusCode::NOT_MODIFIED, headers, Body::empty()));
        }
        Precondition::Proceed { range_allowed } => range_allowed,
    };

    let size = reader.seek(SeekFrom::End(0)).map_err(HttpError::internal)?;
    reader.seek(SeekFrom::Start(0)).map_err(HttpError::internal)?;

    if !headers.contains_key(header::CONTENT_TYPE) {
        let content_type = match content_type_for(name) {
            Some(ct) => ct,
            None => sniff(&mut reader)?,
        };
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
    }
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let range = if range_allowed {
        request.header(&header::RANGE)
    } else {
        None
    };

    let (status, start, length) = match range.map(|r| parse_range(r, size)) {
        Some(RangeParse::Valid { start, end }) => {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes {start}-{end}/{size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            (StatusCode::PARTIAL_CONTENT, start, end - start + 1)
        }
        Some(RangeParse::NotSatisfiable) => {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            return Ok(build(
                StatusCode::RANGE_NOT_SATISFIABLE,
                headers,
                Body::from("invalid range: failed to overlap"),
            ));
        }
        Some(RangeParse::Ignore) | None => (StatusCode::OK, 0, size),
    };

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    if request.method == Method::HEAD {
        return Ok(build(status, headers, Body::empty()));
    }

    reader
        .seek(SeekFrom::Start(start))
        .map_err(HttpError::internal)?;
    let chunks = futures::stream::try_unfold(reader.take(length), next_chunk);

    Ok(build(status, headers, Body::from_stream(chunks)))
}

/// Read the next body chunk, `None` once `reader` is exhausted.
async fn next_chunk<R>(mut reader: R) -> io::Result<Option<(Vec<u8>, R)>>
where
    R: Read + Send + 'static,
{
    let (reader, chunk) = tokio::task::spawn_blocking(move || {
        let mut chunk = vec![0_u8; CHUNK_SIZE];
        let read = loop {
            match reader.read(&mut chunk) {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        };
        chunk.truncate(read);
        Ok((reader, chunk))
    })
    .await
    .map_err(io::Error::other)??;

    Ok((!chunk.is_empty()).then_some((chunk, reader)))
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Outcome of precondition evaluation.
#[derive(Debug, PartialEq, Eq)]
enum Precondition {
    /// 412 Precondition Failed.
    Failed,
    /// 304 Not Modified.
    NotModified,
    /// Serve the content; `range_allowed` is false when `If-Range` failed.
    Proceed { range_allowed: bool },
}

/// Result of evaluating a single conditional header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cond {
    Absent,
    True,
    False,
}

/// Evaluate preconditions in RFC 7232 section 6 order.
fn evaluate_preconditions(
    request: &RequestMeta,
    etag: Option<&str>,
    modified: Option<u64>,
) -> Precondition {
    let mut cond = check_if_match(request, etag);
    if cond == Cond::Absent {
        cond = check_if_unmodified_since(request, modified);
    }
    if cond == Cond::False {
        return Precondition::Failed;
    }

    match check_if_none_match(request, etag) {
        Cond::False => {
            if request.is_get_or_head() {
                return Precondition::NotModified;
            }
            return Precondition::Failed;
        }
        Cond::Absent => {
            if check_if_modified_since(request, modified) == Cond::False {
                return Precondition::NotModified;
            }
        }
        Cond::True => {}
    }

    let range_allowed = request.header(&header::RANGE).is_none()
        || check_if_range(request, etag, modified) != Cond::False;
    Precondition::Proceed { range_allowed }
}

fn check_if_match(request: &RequestMeta, etag: Option<&str>) -> Cond {
    let Some(value) = request.header(&header::IF_MATCH) else {
        return Cond::Absent;
    };
    let matched = value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || etag.is_some_and(|current| etag_strong_match(candidate, current))
    });
    if matched { Cond::True } else { Cond::False }
}

fn check_if_unmodified_since(request: &RequestMeta, modified: Option<u64>) -> Cond {
    let (Some(value), Some(modified)) = (request.header(&header::IF_UNMODIFIED_SINCE), modified)
    else {
        return Cond::Absent;
    };
    match parse_http_date(value) {
        Some(since) if modified <= since => Cond::True,
        Some(_) => Cond::False,
        None => Cond::Absent,
    }
}

fn check_if_none_match(request: &RequestMeta, etag: Option<&str>) -> Cond {
    let Some(value) = request.header(&header::IF_NONE_MATCH) else {
        return Cond::Absent;
    };
    let matched = value.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || etag.is_some_and(|current| etag_weak_match(candidate, current))
    });
    if matched { Cond::False } else { Cond::True }
}

fn check_if_modified_since(request: &RequestMeta, modified: Option<u64>) -> Cond {
    if !request.is_get_or_head() {
        return Cond::Absent;
    }
    let (Some(value), Some(modified)) = (request.header(&header::IF_MODIFIED_SINCE), modified)
    else {
        return Cond::Absent;
    };
    match parse_http_date(value) {
        Some(since) if modified <= since => Cond::False,
        Some(_) => Cond::True,
        None => Cond::Absent,
    }
}

fn check_if_range(request: &RequestMeta, etag: Option<&str>, modified: Option<u64>) -> Cond {
    if !request.is_get_or_head() {
        return Cond::Absent;
    }
    let Some(value) = request.header(&header::IF_RANGE) else {
        return Cond::Absent;
    };
    if value.starts_with('"') || value.starts_with("W/") {
        return if etag.is_some_and(|current| etag_strong_match(value, current)) {
            Cond::True
        } else {
            Cond::False
        };
    }
    let Some(modified) = modified else {
        return Cond::False;
    };
    match parse_http_date(value) {
        Some(date) if date == modified => Cond::True,
        _ => Cond::False,
    }
}

fn etag_strong_match(a: &str, b: &str) -> bool {
    a == b && !a.is_empty() && a.starts_with('"')
}

fn etag_weak_match(a: &str, b: &str) -> bool {
    let a = a.strip_prefix("W/").unwrap_or(a);
    let b = b.strip_prefix("W/").unwrap_or(b);
    !a.is_empty() && a == b
}

/// Parsed `Range` header.
#[derive(Debug, PartialEq, Eq)]
enum RangeParse {
    /// Inclusive byte range within the content.
    Valid { start: u64, end: u64 },
    /// The range does not overlap the content (416).
    NotSatisfiable,
    /// Malformed, multi-range or non-bytes unit: serve the full content.
    Ignore,
}

/// Parse a single-range `bytes=` header against a content of `size` bytes.
fn parse_range(value: &str, size: u64) -> RangeParse {
    let Some(spec) = value.strip_prefix("bytes=") else {
        return RangeParse::Ignore;
    };
    if spec.contains(',') {
        return RangeParse::Ignore;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return RangeParse::Ignore;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix range: last N bytes.
        let Ok(suffix) = end.parse::<u64>() else {
            return RangeParse::Ignore;
        };
        if suffix == 0 || size == 0 {
            return RangeParse::NotSatisfiable;
        }
        return RangeParse::Valid {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeParse::Ignore;
    };
    if start >= size {
        return RangeParse::NotSatisfiable;
    }
    let end = if end.is_empty() {
        size - 1
    } else {
        let Ok(end) = end.parse::<u64>() else {
            return RangeParse::Ignore;
        };
        if end < start {
            return RangeParse::Ignore;
        }
        end.min(size - 1)
    };
    RangeParse::Valid { start, end }
}

/// Content type derived from the name's extension.
fn content_type_for(name: &str) -> Option<String> {
    let mime = mime_guess::from_path(name).first()?;
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
        Some(format!("{mime}; charset=utf-8"))
    } else {
        Some(mime.to_string())
    }
}

/// Guess a content type from the first bytes of `reader`, then rewind it.
fn sniff<R: Read + Seek>(reader: &mut R) -> Result<String, HttpError> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader
        .by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(HttpError::internal)?;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(HttpError::internal)?;
    Ok(detect_content_type(&head).to_owned())
}

fn detect_content_type(head: &[u8]) -> &'static str {
    let trimmed = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |i| &head[i..]);
    let lowered: Vec<u8> = trimmed.iter().take(14).map(u8::to_ascii_lowercase).collect();
    if lowered.starts_with(b"<!doctype html") || lowered.starts_with(b"<html") {
        return "text/html; charset=utf-8";
    }

    let text = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    };
    let has_binary = head
        .iter()
        .any(|&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)) || b == 0x7f);
    if text && !has_binary {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

/// Whole seconds since the Unix epoch, `None` for the epoch itself or earlier.
fn unix_seconds(time: SystemTime) -> Option<u64> {
    let secs = time.duration_since(UNIX_EPOCH).ok()?.as_secs();
    (secs != 0).then_some(secs)
}

fn format_http_date(secs: u64) -> Option<HeaderValue> {
    let date = httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(secs));
    HeaderValue::from_str(&date).ok()
}

/// Seconds since the Unix epoch for an IMF-fixdate, RFC 850 or asctime date.
fn parse_http_date(value: &str) -> Option<u64> {
    let date = httpdate::parse_http_date(value).ok()?;
    Some(date.duration_since(UNIX_EPOCH).ok()?.as_secs())
}
