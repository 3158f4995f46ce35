//! Shared template store with snapshot swapping.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;

use crate::error::{TemplateError, WatchError};
use crate::functions::Functions;
use crate::set::{TemplateSet, read_source, template_name};
use crate::watcher::TemplateWatcher;

/// Live-reloading template store.
///
/// Renders against an immutable [`TemplateSet`] snapshot and replaces that
/// snapshot when a template file is re-parsed.
///
/// # Thread Safety
///
/// - Uses internal `RwLock<Arc<TemplateSet>>` for the current snapshot
/// - Renders hold the read lock only long enough to clone the `Arc`
/// - Reloads are serialized by an internal mutex
pub struct TemplateStore {
    directory: PathBuf,
    functions: Functions,
    reload_lock: Mutex<()>,
    current: RwLock<Arc<TemplateSet>>,
}

impl TemplateStore {
    /// Compile every template file in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the directory cannot be listed or any
    /// template fails to compile.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        Self::open_with_functions(directory, Functions::new())
    }

    /// Compile every template file in `directory` with extra template functions.
    ///
    /// Only regular, non-hidden files directly inside `directory` are
    /// compiled; subdirectories are not descended into.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the directory cannot be listed or any
    /// template fails to compile.
    pub fn open_with_functions(
        directory: impl Into<PathBuf>,
        functions: Functions,
    ) -> Result<Self, TemplateError> {
        let directory = directory.into();
        let paths = template_files(&directory)?;
        let set = TemplateSet::compile(&paths, &functions)?;

        tracing::debug!(
            directory = %directory.display(),
            count = paths.len(),
            "Compiled templates"
        );

        Ok(Self::from_set(directory, functions, set))
    }

    /// Create a store around an already compiled snapshot.
    #[must_use]
    pub fn from_set(directory: impl Into<PathBuf>, functions: Functions, set: TemplateSet) -> Self {
        Self {
            directory: directory.into(),
            functions,
            reload_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(set)),
        }
    }

    /// Directory the templates were loaded from.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Function table applied to every snapshot.
    #[must_use]
    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    /// Current snapshot.
    ///
    /// The returned `Arc` stays valid and unchanged even if a reload
    /// replaces the store's snapshot afterwards.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TemplateSet> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Render template `name` with `data` into `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] for unknown names and
    /// [`TemplateError::Execute`] if rendering fails part way.
    pub fn render<W, T>(&self, writer: W, name: &str, data: &T) -> Result<(), TemplateError>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        self.snapshot().execute(writer, name, data)
    }

    /// Render template `name` with `data` into a string.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    pub fn render_to_string<T>(&self, name: &str, data: &T) -> Result<String, TemplateError>
    where
        T: Serialize + ?Sized,
    {
        self.snapshot().render_to_string(name, data)
    }

    /// Re-parse one template file and publish a new snapshot.
    ///
    /// On failure the current snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the file cannot be read or parsed.
    pub fn reload_file(&self, path: &Path) -> Result<(), TemplateError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let name = template_name(path)?;
        let source = read_source(path)?;
        let next = self.snapshot().with_template(&name, source)?;

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        Ok(())
    }

    /// Start reloading templates when their files are written.
    ///
    /// Dropping or stopping the returned handle ends the watch.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the directory watch cannot be set up. The
    /// store keeps serving its current templates either way.
    pub fn watch(self: &Arc<Self>) -> Result<TemplateWatcher, WatchError> {
        TemplateWatcher::start(Arc::clone(self))
    }
}

impl std::fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore")
            .field("directory", &self.directory)
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}

/// Whether a file name is hidden (dot-prefixed).
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn template_files(directory: &Path) -> Result<Vec<PathBuf>, TemplateError> {
    let io_error = |source| TemplateError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        if is_hidden(&path) || !entry.file_type().map_err(io_error)?.is_file() {
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
