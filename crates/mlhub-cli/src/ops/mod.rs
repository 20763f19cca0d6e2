//! Operations shared by the commands.

pub mod context;
pub mod install;
pub mod remove;

pub use context::Context;
