//! Query templates with named `{placeholder}` parameters.
//!
//! Rendering is plain textual interpolation: values are inserted using their
//! display form and are **not** SQL-escaped. Callers are responsible for the
//! values they bind.

use crate::core::{DalError, Result};
use crate::table::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Binding key under which the dataset name is always available.
pub const DATASET_KEY: &str = "data_name";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is valid")
});

/// An ordered mapping from placeholder name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, Value)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ParameterSet::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Binds a name, replacing an earlier binding in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// A template paired with its own parameters, one element of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryObject {
    pub template: String,
    pub params: ParameterSet,
}

impl QueryObject {
    pub fn new(template: impl Into<String>) -> Self {
        QueryObject {
            template: template.into(),
            params: ParameterSet::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn render(&self, dataset_name: &str) -> Result<String> {
        render(&self.template, dataset_name, &self.params)
    }
}

/// Substitutes every `{name}` in `template`.
///
/// The scope holds `dataset_name` under [`DATASET_KEY`] plus every entry of
/// `params`, which may override it. `{{` and `}}` render literal braces.
pub fn render(template: &str, dataset_name: &str, params: &ParameterSet) -> Result<String> {
    let mut missing: Option<String> = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let Some(name) = caps.get(1) else {
            return caps[0][..1].to_string();
        };
        let key = name.as_str().trim();
        match params.get(key) {
            Some(value) => value.to_string(),
            None if key == DATASET_KEY => dataset_name.to_string(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(key) => Err(DalError::Template(format!(
            "no binding for placeholder '{{{}}}' in template: {}",
            key, template
        ))),
        None => Ok(rendered.into_owned()),
    }
}
