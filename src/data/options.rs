//! Per-read decoder options.

use std::collections::BTreeMap;

/// Named options passed to a decoder.
///
/// Values are TOML values so options can be kept in configuration files.
/// Decoders ignore options they do not know.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOptions {
    values: BTreeMap<String, toml::Value>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, builder style.
    pub fn with(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<toml::Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&toml::Value> {
        self.values.get(name)
    }

    /// Boolean option, `default` if unset or not a boolean.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// String option.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<toml::Table> for ReadOptions {
    fn from(table: toml::Table) -> Self {
        Self {
            values: table.into_iter().collect(),
        }
    }
}
