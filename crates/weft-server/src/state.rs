//! Application state.

use std::sync::Arc;

use weft_files::{DirFs, FileStore};
use weft_templates::TemplateStore;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Live-reloading templates for pages.
    pub(crate) templates: Arc<TemplateStore>,
    /// Static files with cached `ETag`s.
    pub(crate) files: Arc<FileStore<DirFs>>,
}
