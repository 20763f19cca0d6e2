//! Package manifest (`MLHUB.yaml`).
//!
//! Manifests in the wild come in several shapes: identity fields at the top
//! level or under `meta`, commands as a list or as a mapping of descriptions,
//! dependencies at the top level or under `meta`, and file lists either under
//! `dependencies.files` or at the top level. [`Manifest::from_yaml`] folds all
//! of them into one canonical structure so nothing downstream has to care.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::deps::{self, Category, DependencyEntry, DependencyGroup, FileDep, scalar_string};
use crate::language::Language;
use crate::types::ModelName;
use crate::version::{ModelVersion, VersionError};

/// Errors raised while reading a manifest document.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The document is not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document is valid YAML but not a mapping.
    #[error("manifest must be a mapping of fields")]
    NotAMapping,

    /// A required field is absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A field has the wrong shape.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The `version` field is not a strict version.
    #[error("invalid version: {0}")]
    Version(#[from] VersionError),
}

/// A command a package exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name; the script is `<name>.<ext>`.
    pub name: String,
    /// Optional one-line description.
    pub description: Option<String>,
}

/// Canonical, normalised package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Unique package name.
    pub name: ModelName,
    /// Short human-readable title.
    pub title: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Strict package version.
    pub version: ModelVersion,
    /// Declared primary runtime.
    pub language: Language,
    /// Exposed commands, in document order.
    pub commands: Vec<CommandInfo>,
    /// Flattened dependency groups, in document order.
    pub dependencies: Vec<DependencyGroup>,
    /// Explicit file list, when the package declares one.
    pub files: Option<Vec<FileDep>>,
    /// Commands that need a graphical display.
    pub display: BTreeSet<String>,
}

impl Manifest {
    /// Parse and normalise a manifest document.
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_schema::Manifest;
    ///
    /// let m = Manifest::from_yaml(
    ///     "meta:\n  name: rain\n  version: 1.2.0\n  languages: R\ncommands: [demo, print]\n",
    /// )
    /// .unwrap();
    /// assert_eq!(m.name.as_str(), "rain");
    /// assert!(m.has_command("demo"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] for invalid YAML, a missing name or an invalid
    /// field.
    pub fn from_yaml(text: &str) -> Result<Self, ManifestError> {
        let doc: Value = serde_yaml::from_str(text)?;
        let root = doc.as_mapping().ok_or(ManifestError::NotAMapping)?;
        let meta = root.get("meta").and_then(Value::as_mapping);
        let lookup = |key: &str| field(root, meta, key);

        let name = lookup("name")
            .and_then(scalar_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ManifestError::MissingField("name"))?;
        if !ModelName::is_valid(&name) {
            return Err(ManifestError::InvalidField {
                field: "name".to_string(),
                reason: format!("'{name}' cannot be used as a directory name"),
            });
        }

        let version = lookup("version")
            .and_then(scalar_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ManifestError::MissingField("version"))?;
        let version = ModelVersion::parse(&version)?;

        let language = lookup("languages")
            .and_then(first_string)
            .filter(|s| !s.trim().is_empty())
            .map(|s| Language::parse(&s))
            .ok_or(ManifestError::MissingField("languages"))?;

        let commands = match lookup("commands") {
            Some(value) => parse_commands(value)?,
            None => Vec::new(),
        };

        let display = lookup("display")
            .map(string_list)
            .transpose()?
            .unwrap_or_default()
            .into_iter()
            .collect();

        let dependencies = match lookup("dependencies") {
            Some(value) => deps::flatten(value)?,
            None => Vec::new(),
        };

        let files = file_list(&dependencies, root)?;

        Ok(Self {
            name: ModelName::from(name),
            title: lookup("title").and_then(scalar_string).filter(|s| !s.is_empty()),
            description: lookup("description")
                .and_then(scalar_string)
                .filter(|s| !s.is_empty()),
            version,
            language,
            commands,
            dependencies,
            files,
            display,
        })
    }

    /// Whether the manifest declares `command`.
    pub fn has_command(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c.name == command)
    }

    /// Names of all declared commands, in document order.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.name.as_str())
    }

    /// Whether `command` is marked as needing a graphical display.
    pub fn requires_display(&self, command: &str) -> bool {
        self.display.contains(command)
    }

    /// The script file name for `command` under the declared language.
    pub fn script_name(&self, command: &str) -> String {
        format!("{command}.{}", self.language.script_extension())
    }
}

fn field<'a>(root: &'a Mapping, meta: Option<&'a Mapping>, key: &str) -> Option<&'a Value> {
    root.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| meta.and_then(|m| m.get(key)).filter(|v| !v.is_null()))
}

fn file_list(
    groups: &[DependencyGroup],
    root: &Mapping,
) -> Result<Option<Vec<FileDep>>, ManifestError> {
    let declared: Vec<&DependencyGroup> = groups
        .iter()
        .filter(|g| g.category() == Category::Files)
        .collect();

    let top_level;
    let source = if declared.is_empty() {
        let Some(value) = root.get("files").filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        top_level = deps::flatten_at(value, vec!["files".to_string()])?;
        top_level.iter().collect()
    } else {
        declared
    };

    let files = source
        .into_iter()
        .flat_map(|g| g.entries.iter())
        .filter_map(|entry| match entry {
            DependencyEntry::File(file) => Some(file.clone()),
            DependencyEntry::Package(_) => None,
        })
        .collect();

    Ok(Some(files))
}

fn parse_commands(value: &Value) -> Result<Vec<CommandInfo>, ManifestError> {
    match value {
        Value::Mapping(map) => {
            let mut commands = Vec::with_capacity(map.len());
            for (k, v) in map {
                let name = scalar_string(k).ok_or_else(|| ManifestError::InvalidField {
                    field: "commands".into(),
                    reason: "command names must be strings".into(),
                })?;
                let description = match v {
                    Value::Mapping(detail) => detail.get("description").and_then(scalar_string),
                    other => scalar_string(other),
                }
                .filter(|d| !d.is_empty());
                commands.push(CommandInfo { name, description });
            }
            Ok(commands)
        }
        other => Ok(string_list(other)?
            .into_iter()
            .map(|name| CommandInfo {
                name,
                description: None,
            })
            .collect()),
    }
}

/// A sequence of scalars or a comma-separated string.
fn string_list(value: &Value) -> Result<Vec<String>, ManifestError> {
    let invalid = || ManifestError::InvalidField {
        field: "list".into(),
        reason: "expected a list of names or a comma-separated string".into(),
    };

    let raw: Vec<String> = match value {
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_string(item).ok_or_else(invalid))
            .collect::<Result<_, _>>()?,
        other => vec![scalar_string(other).ok_or_else(invalid)?],
    };

    Ok(raw
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(items) => items.first().and_then(scalar_string),
        other => scalar_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{PythonSource, RSource};

    const NESTED: &str = r"
meta:
  name: audit
  title: Audit risk model
  version: 0.2.1
  languages: R
  display: [display]
  dependencies:
    r: rattle, magrittr
    github: mlhubber/mlhub
commands:
  demo: Run the demo
  display:
    description: Visualise the model
  print:
";

    #[test]
    fn test_nested_meta_manifest() {
        let m = Manifest::from_yaml(NESTED).unwrap();
        assert_eq!(m.name.as_str(), "audit");
        assert_eq!(m.version, ModelVersion::new(0, 2, 1));
        assert_eq!(m.language, Language::R);
        assert_eq!(m.title.as_deref(), Some("Audit risk model"));
        assert_eq!(
            m.command_names().collect::<Vec<_>>(),
            vec!["demo", "display", "print"]
        );
        assert_eq!(m.commands[1].description.as_deref(), Some("Visualise the model"));
        assert_eq!(m.commands[2].description, None);
        assert!(m.requires_display("display"));
        assert!(!m.requires_display("demo"));
        assert_eq!(m.dependencies.len(), 2);
        assert_eq!(m.dependencies[0].category(), Category::R(RSource::Cran));
        assert_eq!(m.dependencies[1].category(), Category::R(RSource::GitHub));
        assert!(m.files.is_none());
        assert_eq!(m.script_name("demo"), "demo.R");
    }

    #[test]
    fn test_flat_manifest_with_files_under_dependencies() {
        let m = Manifest::from_yaml(
            r"
name: colorize
version: 1.0
languages: python
commands: [demo, color]
dependencies:
  pip3: opencv-python, numpy
  files:
    - demo.py
    - color.py
    - https://example.com/model.pt: cache/model.pt
",
        )
        .unwrap();
        assert_eq!(m.language, Language::Python);
        assert_eq!(m.version, ModelVersion::new(1, 0, 0));
        assert_eq!(m.dependencies[0].category(), Category::Python(PythonSource::Pip3));
        let files = m.files.as_ref().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[2].dest.as_deref(), Some("cache/model.pt"));
        assert_eq!(m.script_name("demo"), "demo.py");
    }

    #[test]
    fn test_top_level_files() {
        let m = Manifest::from_yaml(
            "name: x\nversion: 1.0.0\nlanguages: sh\nfiles: [run.sh, README.md]\n",
        )
        .unwrap();
        let files = m.files.unwrap();
        assert_eq!(files[0].source, "run.sh");
        assert_eq!(files[1].dest, None);
    }

    #[test]
    fn test_bare_dependency_list() {
        let m = Manifest::from_yaml(
            "name: x\nversion: 1.0.0\nlanguages: python\ndependencies: [pandas, numpy]\n",
        )
        .unwrap();
        assert_eq!(m.dependencies.len(), 1);
        assert_eq!(m.dependencies[0].category(), Category::Default);
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            Manifest::from_yaml("version: 1.0.0\nlanguages: R\n"),
            Err(ManifestError::MissingField("name"))
        ));
        assert!(matches!(
            Manifest::from_yaml("name: x\nlanguages: R\n"),
            Err(ManifestError::MissingField("version"))
        ));
        assert!(matches!(
            Manifest::from_yaml("name: x\nversion: 1.0.0\n"),
            Err(ManifestError::MissingField("languages"))
        ));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            Manifest::from_yaml("- just\n- a list\n"),
            Err(ManifestError::NotAMapping)
        ));
        assert!(matches!(
            Manifest::from_yaml("name: [unclosed"),
            Err(ManifestError::Yaml(_))
        ));
        assert!(matches!(
            Manifest::from_yaml("name: x\nversion: 1.0.0rc1\nlanguages: R\n"),
            Err(ManifestError::Version(_))
        ));
    }

    #[test]
    fn test_name_must_be_a_plain_directory_name() {
        for name in ["../victim", "..", "a/b", "'a\\b'"] {
            let doc = format!("name: {name}\nversion: 1.0.0\nlanguages: R\n");
            assert!(
                matches!(
                    Manifest::from_yaml(&doc),
                    Err(ManifestError::InvalidField { ref field, .. }) if field == "name"
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_top_level_wins_over_meta() {
        let m = Manifest::from_yaml(
            "name: outer\nversion: 2.0.0\nmeta:\n  name: inner\n  languages: R\n",
        )
        .unwrap();
        assert_eq!(m.name.as_str(), "outer");
        assert_eq!(m.language, Language::R);
    }
}
