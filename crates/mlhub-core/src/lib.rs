//! Core library for mlhub.
//!
//! Turns model references into fetched archives, lays packages out under the
//! model root, installs their declared dependencies and dispatches commands
//! to the scripts they ship. Side effects that need a human or a host tool
//! (confirmation, progress output, package managers) go through the
//! [`Prompter`], [`Reporter`] and [`deps::CommandRunner`] seams.

pub mod completion;
pub mod deps;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod io;
pub mod package;
pub mod paths;
pub mod prompt;
pub mod reference;
pub mod registry;

pub mod reporter;

pub use completion::CompletionCache;
pub use error::{HubError, Result};
pub use paths::HubLayout;
pub use prompt::{Prompter, ScriptedPrompter};
pub use reporter::{NullReporter, RecordingReporter, Reporter};

/// User Agent string for registry and archive requests
pub const USER_AGENT: &str = concat!("mlhub/", env!("CARGO_PKG_VERSION"));
