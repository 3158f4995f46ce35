//! Live-reloading template rendering for Weft.
//!
//! This crate provides:
//! - [`TemplateSet`]: an immutable snapshot of compiled templates
//! - [`TemplateStore`]: the shared entry point that renders against the
//!   current snapshot and swaps in re-parsed templates
//! - [`TemplateWatcher`]: background reload of written template files
//!
//! # Flavors
//!
//! Every template is compiled in one of two flavors, picked from its file
//! name by [`ext2`]: names whose second-to-last extension is [`TEXT_MARKER`]
//! (e.g. `welcome.txt.tmpl`) render without escaping; everything else is
//! HTML-escaped.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use weft_templates::TemplateStore;
//!
//! let store = Arc::new(TemplateStore::open("templates")?);
//!
//! // Keep the handle alive for as long as templates should reload.
//! let _watcher = store.watch()?;
//!
//! let mut out = Vec::new();
//! store.render(&mut out, "index.html", &"world")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod flavor;
mod functions;
mod set;
mod store;
mod watcher;

pub use error::{TemplateError, WatchError};
pub use flavor::{Flavor, TEXT_MARKER, ext2};
pub use functions::Functions;
pub use set::{PAYLOAD_NAME, TemplateSet};
pub use store::TemplateStore;
pub use watcher::TemplateWatcher;

pub use minijinja::Value;
