//! Error taxonomy shared by every mlhub operation.

use std::io;
use std::path::PathBuf;

use mlhub_schema::{ManifestError, ModelName, ModelVersion};
use thiserror::Error;

/// Everything that can stop an mlhub command.
#[derive(Error, Debug)]
pub enum HubError {
    /// The reference could not be turned into an archive path or URL.
    #[error("cannot resolve '{reference}': {reason}")]
    InvalidReference {
        /// What the user typed.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Network transfer or archive read failed.
    #[error("failed to fetch '{location}': {reason}")]
    FetchFailed {
        /// URL or local path being fetched.
        location: String,
        /// Underlying failure.
        reason: String,
    },

    /// A manifest is missing, unparsable or missing required fields.
    #[error("malformed manifest '{location}': {source}")]
    ManifestMalformed {
        /// Where the manifest came from.
        location: String,
        /// The parse failure.
        #[source]
        source: ManifestError,
    },

    /// No manifest file exists where one is required.
    #[error("no MLHUB.yaml found in '{}'", .0.display())]
    ManifestMissing(PathBuf),

    /// The user declined to upgrade, downgrade or replace a model.
    #[error("kept '{model}' at version {installed} (declined {requested})")]
    VersionConflictDeclined {
        /// Model name.
        model: ModelName,
        /// Version currently on disk.
        installed: ModelVersion,
        /// Version that would have replaced it.
        requested: ModelVersion,
    },

    /// The user declined to replace an installation with an unreadable manifest.
    #[error("kept the existing installation of '{0}'")]
    ReplaceDeclined(ModelName),

    /// The model is not installed.
    #[error("model '{0}' is not installed")]
    NotInstalled(ModelName),

    /// The command is not declared or its script is missing.
    #[error("command '{command}' not found in model '{model}'")]
    CommandNotFound {
        /// Command name.
        command: String,
        /// Model name.
        model: ModelName,
    },

    /// A dispatched script failed because a package or module is missing.
    #[error("model '{model}' requires '{dependency}', which is not installed")]
    MissingDependency {
        /// Missing module or package.
        dependency: String,
        /// Model name.
        model: ModelName,
    },

    /// A dispatched script could not find a data resource it needs.
    #[error("model '{0}' could not find a required data resource")]
    DataResourceNotFound(ModelName),

    /// A dependency backend's tool is not on the system.
    #[error("cannot install {category} dependencies: '{tool}' is not available")]
    BackendUnavailable {
        /// Missing executable.
        tool: String,
        /// Dependency category that needed it.
        category: String,
    },

    /// The model ships no README.
    #[error("no README found for model '{0}'")]
    ReadmeNotFound(ModelName),

    /// The user declined to run a display command without a display.
    #[error("command '{command}' of '{model}' needs a graphical display")]
    DisplayDeclined {
        /// Command name.
        command: String,
        /// Model name.
        model: ModelName,
    },

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HubError {
    /// Build a [`HubError::FetchFailed`] from any displayable cause.
    pub fn fetch(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`HubError::InvalidReference`].
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// A declined version conflict is a no-op decline and exits cleanly.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::VersionConflictDeclined { .. } | Self::ReplaceDeclined(_) => 0,
            _ => 1,
        }
    }

    /// A suggested next command, if one would help.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidReference { .. } => {
                Some("Run 'ml available' to list models in the repository.".to_string())
            }
            Self::NotInstalled(model) => Some(format!("Run 'ml install {model}' first.")),
            Self::CommandNotFound { model, .. } => {
                Some(format!("Run 'ml commands {model}' to see what it supports."))
            }
            Self::MissingDependency { model, .. } => {
                Some(format!("Run 'ml configure {model}' to install its dependencies."))
            }
            Self::DataResourceNotFound(model) => {
                Some(format!("Run 'ml download {model}' to fetch its data."))
            }
            Self::DisplayDeclined { .. } => Some(
                "Connect with 'ssh -X' or use a desktop session (e.g. X2Go) to enable DISPLAY."
                    .to_string(),
            ),
            Self::ManifestMalformed { .. } | Self::ManifestMissing(_) => {
                Some("Run 'ml remove <model>' to clear a broken installation.".to_string())
            }
            _ => None,
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, HubError>;
