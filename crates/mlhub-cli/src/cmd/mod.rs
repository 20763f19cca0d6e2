//! One module per `ml` subcommand.

pub mod available;
pub mod clean;
pub mod commands;
pub mod configure;
pub mod dispatch;
pub mod download;
pub mod install;
pub mod installed;
pub mod readme;
pub mod remove;
