//! HTTP plumbing shared by the Weft crates.
//!
//! This crate provides:
//! - [`HttpError`]: status code plus optional internal cause
//! - [`serve_content`]: conditional serving of a seekable reader
//!   (preconditions, byte ranges, content type, `Last-Modified`)
//! - Response helpers: [`send_blob`], [`send_json`], [`send_redirect`],
//!   [`send_template`]
//!
//! All helpers build an [`axum::response::Response`]; writing it to the
//! connection is left to the server.

mod content;
mod error;
mod response;

pub use content::{RequestMeta, serve_content};
pub use error::HttpError;
pub use response::{
    InvalidRedirectStatus, send_blob, send_json, send_json_pretty, send_redirect, send_template,
};
