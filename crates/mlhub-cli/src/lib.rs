//! ml - the mlhub command line
//!
//! Installs machine learning model packages from the mlhub repository, a
//! GitHub repository or a local archive, configures their dependencies and
//! runs the commands they ship.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.mlhub/
//! ├── <model>/             # One installed package per directory
//! ├── .cache/<model>/      # Large artifacts kept across reinstalls
//! ├── .model_completion    # Known model names, one per line
//! ├── .command_completion  # Known command names, one per line
//! └── *.mlm                # Downloaded archives, removed by `ml clean`
//! ```

#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
pub mod ops;
pub mod ui;

use clap::{Parser, Subcommand};
use mlhub_core::registry::DEFAULT_REPO;

#[derive(Debug, Parser)]
#[command(name = "ml")]
#[command(author, version = env!("MLHUB_VERSION"), about = "ml - machine learning model packages from mlhub")]
pub struct Cli {
    /// Suppress informational output and next-step suggestions
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Model repository to list and install from
    #[arg(long, global = true, env = "MLHUB_REPO", default_value = DEFAULT_REPO)]
    pub mlhub: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the models available from the repository
    #[command(visible_alias = "avail")]
    Available {
        /// Print model names only
        #[arg(long)]
        name_only: bool,
    },
    /// List the models installed locally
    Installed {
        /// Print model names only
        #[arg(long)]
        name_only: bool,
    },
    /// Install a model from the repository, a GitHub repository, a URL or a local archive
    Install {
        /// Model name, owner/repo[@ref][:path/MLHUB.yaml], URL or archive path
        model: String,
    },
    /// Download the large pre-built parts of a model
    Download {
        /// Installed model
        model: String,
    },
    /// Show a model's README
    Readme {
        /// Installed model
        model: String,
    },
    /// List the commands a model supports
    Commands {
        /// Installed model
        model: String,
        /// Print command names only
        #[arg(long)]
        name_only: bool,
    },
    /// Install a model's dependencies and run its configure script
    Configure {
        /// Installed model
        model: String,
    },
    /// Remove an installed model, or every model when none is given
    Remove {
        /// Installed model
        model: Option<String>,
    },
    /// Remove downloaded model archives
    Clean,
    /// Run a model command: ml <command> <model> [args...]
    #[command(external_subcommand)]
    Dispatch(Vec<String>),
}
