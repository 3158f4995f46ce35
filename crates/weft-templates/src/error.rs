//! Error types for template compilation, rendering and watching.

use std::path::PathBuf;

/// Error returned when compiling or rendering templates fails.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template source file could not be read.
    #[error("Failed to read template {}: {source}", .path.display())]
    Io {
        /// Path of the template file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Template path has no usable file name.
    #[error("Invalid template path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Two source files map to the same template name.
    #[error("Template {name} defined twice: {} and {}", .first.display(), .second.display())]
    Duplicate {
        /// Template name shared by both files.
        name: String,
        /// File that defined the name first.
        first: PathBuf,
        /// File that tried to redefine it.
        second: PathBuf,
    },

    /// Template source failed to parse.
    #[error("Failed to compile template {name}: {source}")]
    Compile {
        /// Template name.
        name: String,
        /// Parser error.
        #[source]
        source: minijinja::Error,
    },

    /// No template with the requested name exists in its flavor.
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template failed while rendering; output may be incomplete.
    #[error("Failed to render template {name}: {source}")]
    Execute {
        /// Template name.
        name: String,
        /// Render error.
        #[source]
        source: minijinja::Error,
    },
}

/// Error returned when the template directory watch cannot be set up.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Notification backend could not create or register the watch.
    #[error("Failed to watch template directory: {0}")]
    Notify(#[from] notify::Error),

    /// Watcher thread could not be spawned.
    #[error("Failed to spawn template watcher: {0}")]
    Spawn(#[from] std::io::Error),
}
