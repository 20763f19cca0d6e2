//! UI Module - terminal output and interactive confirmation
//!
//! Commands print their listings with plain `println!`. Progress and status
//! messages coming out of the core library go through [`Output`], the
//! terminal [`mlhub_core::Reporter`]. Yes/no questions go through
//! [`TerminalPrompter`].
//!
//! # Modules
//!
//! - [`theme`] - Icons and formatting helpers
//! - [`output`] - Terminal reporter
//! - [`prompt`] - Yes/no questions on stdin

pub mod output;
pub mod prompt;
pub mod theme;

pub use output::Output;
pub use prompt::TerminalPrompter;
pub use theme::Icons;
