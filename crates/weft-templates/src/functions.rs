//! Function-extension table shared by every compiled template.

use std::collections::BTreeMap;

use minijinja::{Environment, Value};

/// Named callables (or constants) made available to all templates.
///
/// The table is applied to both flavors when a [`TemplateSet`](crate::TemplateSet)
/// is built and is carried along unchanged into every reloaded snapshot.
///
/// ```
/// use weft_templates::{Functions, Value};
///
/// let functions = Functions::new()
///     .with("shout", Value::from_function(|s: String| s.to_uppercase()))
///     .with("site_name", Value::from("Weft"));
/// assert_eq!(functions.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Functions {
    entries: BTreeMap<String, Value>,
}

impl Functions {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value, replacing any previous entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn apply(&self, env: &mut Environment<'static>) {
        for (name, value) in &self.entries {
            env.add_global(name.clone(), value.clone());
        }
    }
}
