//! Declared primary language of a package.

use std::fmt;

/// The primary runtime a package declares in its `languages` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// R scripts, run with `Rscript`.
    R,
    /// Python scripts, run with `python3`.
    Python,
    /// Shell scripts, executed directly.
    Shell,
    /// Anything else; the raw string doubles as the script extension.
    Other(String),
}

impl Language {
    /// Parse a `languages` value. Matching is case-insensitive and accepts
    /// abbreviations of `python` (`py`, `pyth`) as well as longer spellings
    /// (`python3`).
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_schema::Language;
    ///
    /// assert_eq!(Language::parse("Python"), Language::Python);
    /// assert_eq!(Language::parse("py"), Language::Python);
    /// assert_eq!(Language::parse("R"), Language::R);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let token = raw.trim().to_lowercase();
        match token.as_str() {
            "r" | "rscript" => Self::R,
            "sh" | "bash" | "shell" => Self::Shell,
            t if !t.is_empty() && ("python".starts_with(t) || t.starts_with("python")) => {
                Self::Python
            }
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Extension of command scripts written in this language.
    pub fn script_extension(&self) -> &str {
        match self {
            Self::R => "R",
            Self::Python => "py",
            Self::Shell => "sh",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::R => write!(f, "R"),
            Self::Python => write!(f, "Python"),
            Self::Shell => write!(f, "Shell"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_prefixes() {
        for raw in ["python", "Python", "PY", "pyt", "python3"] {
            assert_eq!(Language::parse(raw), Language::Python, "{raw}");
        }
    }

    #[test]
    fn test_r_and_shell() {
        assert_eq!(Language::parse("r"), Language::R);
        assert_eq!(Language::parse("Rscript"), Language::R);
        assert_eq!(Language::parse("bash"), Language::Shell);
    }

    #[test]
    fn test_other_keeps_raw_extension() {
        let lang = Language::parse("jl");
        assert_eq!(lang, Language::Other("jl".into()));
        assert_eq!(lang.script_extension(), "jl");
        assert_eq!(Language::Python.script_extension(), "py");
        assert_eq!(Language::R.script_extension(), "R");
    }
}
