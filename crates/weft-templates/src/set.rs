//! Immutable compiled template snapshots.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::value::Object;
use minijinja::{Environment, ErrorKind, Value};
use serde::Serialize;

use crate::error::TemplateError;
use crate::flavor::Flavor;
use crate::functions::Functions;

/// Name under which the whole render payload is visible to templates.
pub const PAYLOAD_NAME: &str = "this";

/// An immutable collection of compiled templates.
///
/// Templates are split into a text group and an HTML group by [`Flavor`].
/// Each group is its own namespace, keyed by the file name of the source.
/// A snapshot is never mutated after construction; re-parsing a file
/// produces a new snapshot that shares the untouched group.
#[derive(Clone, Debug)]
pub struct TemplateSet {
    text: Arc<Environment<'static>>,
    html: Arc<Environment<'static>>,
}

impl TemplateSet {
    /// Create a snapshot with no templates.
    #[must_use]
    pub fn empty(functions: &Functions) -> Self {
        Self {
            text: Arc::new(new_environment(Flavor::Text, functions)),
            html: Arc::new(new_environment(Flavor::Html, functions)),
        }
    }

    /// Compile templates from source files.
    ///
    /// Each file becomes one template named after its final path segment.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Io`] if a file cannot be read,
    /// [`TemplateError::Duplicate`] if two files share a name and
    /// [`TemplateError::Compile`] if a file fails to parse.
    pub fn compile<P: AsRef<Path>>(paths: &[P], functions: &Functions) -> Result<Self, TemplateError> {
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut sources = Vec::with_capacity(paths.len());

        for path in paths {
            let path = path.as_ref();
            let name = template_name(path)?;
            if let Some(first) = seen.get(&name) {
                return Err(TemplateError::Duplicate {
                    name,
                    first: first.clone(),
                    second: path.to_path_buf(),
                });
            }
            let source = read_source(path)?;
            seen.insert(name.clone(), path.to_path_buf());
            sources.push((name, source));
        }

        Self::from_sources(sources, functions)
    }

    /// Compile templates from in-memory `(name, source)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Duplicate`] if a name repeats and
    /// [`TemplateError::Compile`] if a source fails to parse.
    pub fn from_sources<I, N, S>(sources: I, functions: &Functions) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut text = new_environment(Flavor::Text, functions);
        let mut html = new_environment(Flavor::Html, functions);

        for (name, source) in sources {
            let name = name.into();
            let env = match Flavor::of(&name) {
                Flavor::Text => &mut text,
                Flavor::Html => &mut html,
            };
            if env.get_template(&name).is_ok() {
                return Err(TemplateError::Duplicate {
                    first: PathBuf::from(&name),
                    second: PathBuf::from(&name),
                    name,
                });
            }
            add_template(env, name, source.into())?;
        }

        Ok(Self {
            text: Arc::new(text),
            html: Arc::new(html),
        })
    }

    /// Render template `name` with `data` into `writer`.
    ///
    /// The flavor group is chosen from `name`. Inside the template the whole
    /// payload is available as `this`; if the payload is a map its fields
    /// are also available directly.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] if no such template exists and
    /// [`TemplateError::Execute`] if rendering fails. After an `Execute`
    /// error `writer` may hold partial output.
    pub fn execute<W, T>(&self, writer: W, name: &str, data: &T) -> Result<(), TemplateError>
    where
        W: io::Write,
        T: Serialize + ?Sized,
    {
        let template = self
            .environment(Flavor::of(name))
            .get_template(name)
            .map_err(|source| lookup_error(name, source))?;

        let context = Value::from_object(Payload(Value::from_serialize(data)));
        template
            .render_to_write(context, writer)
            .map_err(|source| TemplateError::Execute {
                name: name.to_owned(),
                source,
            })?;
        Ok(())
    }

    /// Render template `name` with `data` into a string.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn render_to_string<T>(&self, name: &str, data: &T) -> Result<String, TemplateError>
    where
        T: Serialize + ?Sized,
    {
        let mut out = Vec::new();
        self.execute(&mut out, name, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Whether a template with `name` exists in its flavor group.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.environment(Flavor::of(name)).get_template(name).is_ok()
    }

    /// Sorted template names of one flavor group.
    #[must_use]
    pub fn names(&self, flavor: Flavor) -> Vec<String> {
        let mut names: Vec<String> = self
            .environment(flavor)
            .templates()
            .map(|(name, _)| name.to_owned())
            .collect();
        names.sort();
        names
    }

    /// Build a new snapshot with `name` (re)parsed from `source`.
    ///
    /// Only the group for `name`'s flavor is cloned; the clone is private
    /// until returned, so the trees serving live renders are never touched.
    pub(crate) fn with_template(&self, name: &str, source: String) -> Result<Self, TemplateError> {
        let flavor = Flavor::of(name);
        let mut env = Environment::clone(self.environment(flavor));
        add_template(&mut env, name.to_owned(), source)?;

        let env = Arc::new(env);
        Ok(match flavor {
            Flavor::Text => Self {
                text: env,
                html: Arc::clone(&self.html),
            },
            Flavor::Html => Self {
                text: Arc::clone(&self.text),
                html: env,
            },
        })
    }

    fn environment(&self, flavor: Flavor) -> &Environment<'static> {
        match flavor {
            Flavor::Text => &self.text,
            Flavor::Html => &self.html,
        }
    }
}

/// Render context exposing the payload as `this` and, for maps, by field.
#[derive(Debug)]
struct Payload(Value);

impl Object for Payload {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        if key.as_str() == Some(PAYLOAD_NAME) {
            return Some(self.0.clone());
        }
        self.0.get_item(key).ok().filter(|v| !v.is_undefined())
    }
}

fn new_environment(flavor: Flavor, functions: &Functions) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(move |_| flavor.auto_escape());
    env.set_keep_trailing_newline(true);
    functions.apply(&mut env);
    env
}

fn add_template(
    env: &mut Environment<'static>,
    name: String,
    source: String,
) -> Result<(), TemplateError> {
    env.add_template_owned(name.clone(), source)
        .map_err(|source| TemplateError::Compile { name, source })
}

fn lookup_error(name: &str, source: minijinja::Error) -> TemplateError {
    if source.kind() == ErrorKind::TemplateNotFound {
        TemplateError::NotFound(name.to_owned())
    } else {
        TemplateError::Execute {
            name: name.to_owned(),
            source,
        }
    }
}

/// Template name for a source path: its final segment.
pub(crate) fn template_name(path: &Path) -> Result<String, TemplateError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| TemplateError::InvalidPath(path.to_path_buf()))
}

pub(crate) fn read_source(path: &Path) -> Result<String, TemplateError> {
    std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
