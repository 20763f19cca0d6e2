//! Dependency specification.
//!
//! A manifest's `dependencies` block is a tree whose inner keys are category
//! tokens and whose leaves are lists of packages or files. It is flattened
//! once, at parse time, into [`DependencyGroup`]s. Only the last segment of a
//! group's path decides which installer backend handles it.
//!
//! ```yaml
//! dependencies:
//!   system: atril
//!   r: magrittr, dplyr
//!   cran-2018-12-01: rattle
//!   pip3:
//!     - pandas>=1.0
//!   files:
//!     - https://example.com/model.RData
//!     - data/weights.bin: cache/weights.bin
//! ```

use serde_yaml::Value;
use std::fmt;

use crate::manifest::ManifestError;

/// A version constraint attached to a package dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Comparison operator in pip spelling (`==`, `>=`, `<`, ...).
    pub op: String,
    /// The version the operator applies to.
    pub version: String,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// A package dependency, optionally with a version qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Package name (for GitHub-sourced R packages, `owner/repo`).
    pub name: String,
    /// Optional version qualifier.
    pub requirement: Option<Requirement>,
}

const OPERATORS: [&str; 7] = ["==", ">=", "<=", "~=", "!=", ">", "<"];

impl PackageRef {
    /// Parse `name`, `name==1.0`, `name>=1.0`, `name@1.0` or `name (>= 1.0)`.
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_schema::PackageRef;
    ///
    /// let p = PackageRef::parse("pandas>=1.0");
    /// assert_eq!(p.name, "pandas");
    /// assert_eq!(p.requirement.unwrap().to_string(), ">=1.0");
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        // R style: `name (>= 1.0)` or `name (1.0)`
        if let Some((name, rest)) = raw.split_once('(') {
            let inner = rest.trim_end_matches(')').trim();
            return Self {
                name: name.trim().to_string(),
                requirement: Self::requirement(inner),
            };
        }

        if let Some(pos) = raw.find(|c| matches!(c, '=' | '>' | '<' | '~' | '!')) {
            let (name, spec) = raw.split_at(pos);
            return Self {
                name: name.trim().to_string(),
                requirement: Self::requirement(spec),
            };
        }

        // `owner/repo@ref` is a GitHub ref, not a version; only split `@`
        // for plain names.
        if let Some((name, version)) = raw.split_once('@').filter(|_| !raw.contains('/')) {
            return Self {
                name: name.trim().to_string(),
                requirement: Self::requirement(version),
            };
        }

        Self {
            name: raw.to_string(),
            requirement: None,
        }
    }

    fn requirement(spec: &str) -> Option<Requirement> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        for op in OPERATORS {
            if let Some(version) = spec.strip_prefix(op) {
                return Some(Requirement {
                    op: op.to_string(),
                    version: version.trim().to_string(),
                });
            }
        }
        Some(Requirement {
            op: "==".to_string(),
            version: spec.trim_start_matches('=').trim().to_string(),
        })
    }

    /// The exact version requested, if the qualifier pins one.
    pub fn pinned_version(&self) -> Option<&str> {
        self.requirement
            .as_ref()
            .filter(|r| r.op == "==")
            .map(|r| r.version.as_str())
    }

    /// Render in pip requirement syntax (`name==1.0`).
    pub fn pip_spec(&self) -> String {
        match &self.requirement {
            Some(req) => format!("{}{req}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A file to be placed inside an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDep {
    /// Absolute URL or a path relative to the package download directory.
    /// Relative paths may contain glob patterns.
    pub source: String,
    /// Destination relative to the package directory. `None` keeps the
    /// source's relative path (or the URL's file name).
    pub dest: Option<String>,
}

/// One leaf entry of a dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyEntry {
    /// A package for one of the package-manager backends.
    Package(PackageRef),
    /// A file for the raw-file backend.
    File(FileDep),
}

impl fmt::Display for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(p) => write!(f, "{}", p.pip_spec()),
            Self::File(FileDep { source, dest: None }) => write!(f, "{source}"),
            Self::File(FileDep {
                source,
                dest: Some(dest),
            }) => write!(f, "{source} -> {dest}"),
        }
    }
}

/// A flattened `(category path, entries)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    /// Keys leading from the `dependencies` node to this leaf list. Empty
    /// for a bare list directly under `dependencies`.
    pub path: Vec<String>,
    /// Entries of the leaf list, in document order.
    pub entries: Vec<DependencyEntry>,
}

impl DependencyGroup {
    /// The category decided by the last path segment.
    pub fn category(&self) -> Category {
        Category::from_path(&self.path)
    }
}

/// Where R packages are installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RSource {
    /// The current CRAN.
    Cran,
    /// A dated CRAN snapshot, e.g. `cran-2018-12-01`.
    CranSnapshot(String),
    /// `remotes::install_github`.
    GitHub,
}

/// Which Python-ecosystem tool installs the packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PythonSource {
    /// Distribution packages named `python3-<name>`.
    System,
    /// `pip install`.
    Pip,
    /// `pip3 install`.
    Pip3,
    /// `conda install`.
    Conda,
}

/// The installer category of a dependency group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// No category key; the manifest's language decides.
    Default,
    /// Distribution packages (`system`, `sh`, `shell`).
    System,
    /// R packages.
    R(RSource),
    /// Python packages.
    Python(PythonSource),
    /// Raw files placed in the package tree.
    Files,
    /// A token no rule matches.
    Unknown(String),
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Token equals the word.
    Exact(&'static str),
    /// Token starts with the word.
    StartsWith(&'static str),
    /// Token is an abbreviation of the word (the word starts with the token).
    AbbreviationOf(&'static str),
}

impl Rule {
    fn matches(self, token: &str) -> bool {
        match self {
            Self::Exact(word) => token == word,
            Self::StartsWith(word) => token.starts_with(word),
            Self::AbbreviationOf(word) => word.starts_with(token),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Route {
    System,
    Cran,
    CranSnapshot,
    RGitHub,
    SystemPython,
    Pip3,
    Pip,
    Conda,
    Files,
}

/// Category dispatch table. First match wins; more specific rules for an
/// overlapping prefix come first (`pip3` before `pip`, `python3` folded into
/// `python`).
const ROUTES: &[(Rule, Route)] = &[
    (Rule::Exact("system"), Route::System),
    (Rule::AbbreviationOf("shell"), Route::System),
    (Rule::Exact("r"), Route::Cran),
    (Rule::Exact("cran"), Route::Cran),
    (Rule::Exact("github"), Route::RGitHub),
    (Rule::StartsWith("cran-"), Route::CranSnapshot),
    (Rule::StartsWith("python"), Route::SystemPython),
    (Rule::StartsWith("pip3"), Route::Pip3),
    (Rule::StartsWith("pip"), Route::Pip),
    (Rule::Exact("conda"), Route::Conda),
    (Rule::AbbreviationOf("files"), Route::Files),
];

impl Category {
    /// Classify a single category token (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_schema::{Category, RSource};
    ///
    /// assert_eq!(Category::classify("sh"), Category::System);
    /// assert_eq!(
    ///     Category::classify("cran-2020-01-01"),
    ///     Category::R(RSource::CranSnapshot("2020-01-01".into()))
    /// );
    /// ```
    pub fn classify(token: &str) -> Self {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return Self::Default;
        }

        let Some((_, route)) = ROUTES.iter().find(|(rule, _)| rule.matches(&token)) else {
            return Self::Unknown(token);
        };

        match route {
            Route::System => Self::System,
            Route::Cran => Self::R(RSource::Cran),
            Route::CranSnapshot => {
                Self::R(RSource::CranSnapshot(token["cran-".len()..].to_string()))
            }
            Route::RGitHub => Self::R(RSource::GitHub),
            Route::SystemPython => Self::Python(PythonSource::System),
            Route::Pip3 => Self::Python(PythonSource::Pip3),
            Route::Pip => Self::Python(PythonSource::Pip),
            Route::Conda => Self::Python(PythonSource::Conda),
            Route::Files => Self::Files,
        }
    }

    /// Classify a category path by its last segment.
    pub fn from_path(path: &[String]) -> Self {
        path.last()
            .map_or(Self::Default, |token| Self::classify(token))
    }
}

/// Flatten a `dependencies` node into groups.
pub(crate) fn flatten(value: &Value) -> Result<Vec<DependencyGroup>, ManifestError> {
    flatten_at(value, Vec::new())
}

/// Flatten a node that already sits below the category path `path`.
pub(crate) fn flatten_at(
    value: &Value,
    mut path: Vec<String>,
) -> Result<Vec<DependencyGroup>, ManifestError> {
    let mut groups = Vec::new();
    flatten_into(value, &mut path, &mut groups)?;
    Ok(groups)
}

fn flatten_into(
    value: &Value,
    path: &mut Vec<String>,
    groups: &mut Vec<DependencyGroup>,
) -> Result<(), ManifestError> {
    let is_files = Category::from_path(path) == Category::Files;

    match value {
        Value::Null => Ok(()),
        Value::Mapping(map) if is_files && map.values().all(is_scalar) => {
            let mut entries = Vec::new();
            for (k, v) in map {
                entries.push(pair_entry(true, k, v, path)?);
            }
            push_group(groups, path, entries);
            Ok(())
        }
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = scalar_string(k).ok_or_else(|| invalid(path, "category keys must be strings"))?;
                path.push(key);
                flatten_into(v, path, groups)?;
                path.pop();
            }
            Ok(())
        }
        Value::Sequence(items) => {
            let mut entries = Vec::new();
            for item in items {
                match item {
                    Value::Mapping(map) => {
                        for (k, v) in map {
                            if !is_scalar(v) {
                                return Err(invalid(path, "list items must be names or 'source: destination' pairs"));
                            }
                            entries.push(pair_entry(is_files, k, v, path)?);
                        }
                    }
                    other => {
                        let text = scalar_string(other)
                            .ok_or_else(|| invalid(path, "nested lists are not supported"))?;
                        entries.extend(split_names(&text).map(|s| leaf_entry(is_files, s)));
                    }
                }
            }
            push_group(groups, path, entries);
            Ok(())
        }
        Value::Tagged(tagged) => flatten_into(&tagged.value, path, groups),
        scalar => {
            let text = scalar_string(scalar).unwrap_or_default();
            let entries = split_names(&text).map(|s| leaf_entry(is_files, s)).collect();
            push_group(groups, path, entries);
            Ok(())
        }
    }
}

fn push_group(groups: &mut Vec<DependencyGroup>, path: &[String], entries: Vec<DependencyEntry>) {
    if !entries.is_empty() {
        groups.push(DependencyGroup {
            path: path.to_vec(),
            entries,
        });
    }
}

fn leaf_entry(is_files: bool, text: &str) -> DependencyEntry {
    if is_files {
        DependencyEntry::File(FileDep {
            source: text.to_string(),
            dest: None,
        })
    } else {
        DependencyEntry::Package(PackageRef::parse(text))
    }
}

fn pair_entry(
    is_files: bool,
    key: &Value,
    value: &Value,
    path: &[String],
) -> Result<DependencyEntry, ManifestError> {
    let key = scalar_string(key).ok_or_else(|| invalid(path, "entry keys must be strings"))?;
    let value = scalar_string(value).filter(|v| !v.is_empty());

    if is_files {
        return Ok(DependencyEntry::File(FileDep { source: key, dest: value }));
    }

    // `pandas: 1.0` reads as a pinned version.
    let text = match value {
        Some(version) => format!("{key}=={version}"),
        None => key,
    };
    Ok(DependencyEntry::Package(PackageRef::parse(&text)))
}

fn split_names(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn invalid(path: &[String], reason: &str) -> ManifestError {
    let at = if path.is_empty() {
        "dependencies".to_string()
    } else {
        format!("dependencies.{}", path.join("."))
    };
    ManifestError::InvalidField {
        field: at,
        reason: reason.to_string(),
    }
}
