//! Model name newtype.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// The name of a model package.
///
/// Unlike most package managers the name is case preserving: it doubles as
/// the directory name under the model root and is shown back to the user
/// exactly as the package author wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelName(String);

impl ModelName {
    /// Create a model name, trimming surrounding whitespace.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    /// Whether `name` can safely name a directory under the model root: not
    /// empty, not hidden (so never `.` or `..`), and free of path separators.
    ///
    /// ```
    /// use mlhub_schema::ModelName;
    ///
    /// assert!(ModelName::is_valid("rain"));
    /// assert!(!ModelName::is_valid("../victim"));
    /// assert!(!ModelName::is_valid(".."));
    /// ```
    pub fn is_valid(name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::ffi::OsStr> for ModelName {
    fn as_ref(&self) -> &std::ffi::OsStr {
        self.0.as_ref()
    }
}

impl AsRef<std::path::Path> for ModelName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ModelName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for ModelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ModelName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModelName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for ModelName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validity() {
        for ok in ["rain", "audit-2", "iris_v1", " rain "] {
            assert!(ModelName::is_valid(ok), "{ok}");
        }
        for bad in ["", "  ", ".", "..", ".cache", "../victim", "a/b", "a\\b", "/abs"] {
            assert!(!ModelName::is_valid(bad), "{bad}");
        }
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(ModelName::new("  rain\n"), "rain");
    }
}
