//! Shared types for mlhub model packages.
//!
//! Everything in this crate is pure data: parsing and normalising `MLHUB.yaml`
//! manifests, strict model versions, dependency categories and the registry
//! listing. Nothing here touches the network or the filesystem beyond reading
//! a string handed in by the caller.

pub mod deps;
pub mod language;
pub mod manifest;
pub mod registry;
pub mod types;
pub mod version;

// Re-exports
pub use deps::{Category, DependencyEntry, DependencyGroup, FileDep, PackageRef, PythonSource, RSource};
pub use language::Language;
pub use manifest::{CommandInfo, Manifest, ManifestError};
pub use registry::{Registry, RegistryEntry};
pub use types::ModelName;
pub use version::{ModelVersion, VersionError};

/// File name of the package manifest at a package root.
pub const MANIFEST_FILE: &str = "MLHUB.yaml";

/// Older manifest name still found in some packages.
pub const LEGACY_MANIFEST_FILE: &str = "DESCRIPTION.yaml";

/// File name of the registry listing, relative to the registry base URL.
pub const REGISTRY_FILE: &str = "Packages.yaml";

/// Extension of packaged model archives.
pub const EXT_MLM: &str = ".mlm";
