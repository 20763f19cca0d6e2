//! Strict model versions.
//!
//! Model versions are dotted integers, `major.minor` or `major.minor.patch`.
//! Anything else (pre-release tags, build metadata, a fourth component) is
//! rejected rather than guessed at, so a conflict check never silently
//! compares two strings it does not understand.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a version string is not a strict model version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The string was empty after trimming.
    #[error("empty version string")]
    Empty,

    /// Wrong number of dot-separated components.
    #[error("version '{0}' must have the form MAJOR.MINOR or MAJOR.MINOR.PATCH")]
    Components(String),

    /// A component was not a plain non-negative integer.
    #[error("version '{version}' has a non-numeric component '{component}'")]
    NonNumeric {
        /// The full version string.
        version: String,
        /// The offending component.
        component: String,
    },
}

/// A strict `major.minor.patch` version.
///
/// Ordering is componentwise integer comparison, so `1.2.0 < 1.10.0` and
/// `1.2` equals `1.2.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component, zero when the version was written as `major.minor`.
    pub patch: u64,
}

impl ModelVersion {
    /// Build a version from its components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a strict version string.
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_schema::ModelVersion;
    ///
    /// assert!(ModelVersion::parse("1.2.0").unwrap() < ModelVersion::parse("1.10.0").unwrap());
    /// assert!(ModelVersion::parse("1.0.0b1").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] when a component is missing or not numeric.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        let parts: Vec<&str> = s.split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(VersionError::Components(s.to_string()));
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::NonNumeric {
                    version: s.to_string(),
                    component: (*part).to_string(),
                });
            }
            *slot = part.parse().map_err(|_| VersionError::NonNumeric {
                version: s.to_string(),
                component: (*part).to_string(),
            })?;
        }

        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

impl FromStr for ModelVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
