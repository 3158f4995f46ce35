//! Server startup errors.

use weft_templates::TemplateError;

/// Error returned when the server cannot start or stops abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Initial template compilation failed.
    #[error("Failed to load templates: {0}")]
    Templates(#[from] TemplateError),

    /// Host and port do not form a socket address.
    #[error("Invalid server address: {0}")]
    Address(#[from] std::net::AddrParseError),

    /// Binding or serving failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
