//! Registry listing (`Packages.yaml`).
//!
//! The listing is either one YAML sequence of entries or a stream of
//! documents with one entry each. Entries carry their fields under `meta`
//! or flat at the top level.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::deps::scalar_string;
use crate::manifest::ManifestError;
use crate::types::ModelName;

/// One model advertised by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Model name.
    pub name: ModelName,
    /// Short title.
    pub title: Option<String>,
    /// Version as published; kept verbatim for display.
    pub version: Option<String>,
    /// Where the model is fetched from (archive URL or GitHub reference).
    pub url: Option<String>,
    /// Declared language.
    pub languages: Option<String>,
}

impl RegistryEntry {
    fn from_value(value: &Value) -> Option<Self> {
        let root = value.as_mapping()?;
        let meta = root.get("meta").and_then(Value::as_mapping);
        let get = |key: &str| field(root, meta, key);

        let name = get("name").filter(|s| !s.trim().is_empty())?;
        Some(Self {
            name: ModelName::from(name),
            title: get("title"),
            version: get("version"),
            url: get("url"),
            languages: get("languages"),
        })
    }
}

fn field(root: &Mapping, meta: Option<&Mapping>, key: &str) -> Option<String> {
    meta.and_then(|m| m.get(key))
        .or_else(|| root.get(key))
        .and_then(|v| match v {
            Value::Sequence(items) => items.first().and_then(scalar_string),
            other => scalar_string(other),
        })
        .filter(|s| !s.is_empty())
}

/// The parsed registry listing, in published order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// All entries with a usable name.
    pub entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Parse a listing. Entries without a name are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Yaml`] when the text is not a YAML list.
    pub fn from_yaml(text: &str) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = Value::deserialize(document)?;
            match &value {
                Value::Sequence(items) => {
                    entries.extend(items.iter().filter_map(RegistryEntry::from_value));
                }
                Value::Null => {}
                other => entries.extend(RegistryEntry::from_value(other)),
            }
        }
        Ok(Self { entries })
    }

    /// Look up a model by exact name.
    pub fn find(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Names of all listed models.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}
