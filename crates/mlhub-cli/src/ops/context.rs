//! Shared command context.
//!
//! This module defines the `Context` struct, which groups the state every
//! command needs: where models live, how to reach the repository, and the
//! collaborators that talk to the user or the host.

use std::fmt;
use std::sync::Arc;

use mlhub_core::deps::{CommandRunner, InstallContext, SystemRunner};
use mlhub_core::registry::RegistryClient;
use mlhub_core::{CompletionCache, HubLayout, Prompter, Reporter};
use tokio::sync::Mutex;

use crate::ui::{Output, TerminalPrompter};

/// Groups common state used by the commands.
pub struct Context {
    pub layout: HubLayout,
    pub client: reqwest::Client,
    pub registry: RegistryClient,
    pub completion: Mutex<CompletionCache>,
    pub reporter: Arc<dyn Reporter>,
    pub prompter: Arc<dyn Prompter>,
    pub runner: Arc<dyn CommandRunner>,
    pub quiet: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .field("registry", &self.registry)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context with injected collaborators.
    pub fn new(
        layout: HubLayout,
        client: reqwest::Client,
        repo: &str,
        reporter: Arc<dyn Reporter>,
        prompter: Arc<dyn Prompter>,
        runner: Arc<dyn CommandRunner>,
    ) -> std::io::Result<Self> {
        let completion = CompletionCache::load(&layout)?;
        Ok(Self {
            registry: RegistryClient::new(client.clone(), repo),
            layout,
            client,
            completion: Mutex::new(completion),
            reporter,
            prompter,
            runner,
            quiet: false,
        })
    }

    /// Context for a terminal session: `MLHUB_HOME` layout, terminal output
    /// and prompts, host package managers.
    pub fn from_env(repo: &str, quiet: bool) -> anyhow::Result<Self> {
        let layout = HubLayout::from_env()?;
        let client = mlhub_core::io::download::client()?;
        let mut ctx = Self::new(
            layout,
            client,
            repo,
            Arc::new(Output::new(quiet)),
            Arc::new(TerminalPrompter),
            Arc::new(SystemRunner),
        )?;
        ctx.quiet = quiet;
        Ok(ctx)
    }

    /// Backend context for installing dependencies of `model`.
    pub fn install_context<'a>(
        &'a self,
        model: &'a str,
        base_dir: Option<&'a std::path::Path>,
    ) -> InstallContext<'a> {
        InstallContext {
            model,
            layout: &self.layout,
            base_dir,
            client: &self.client,
            runner: self.runner.as_ref(),
            reporter: self.reporter.as_ref(),
        }
    }

    /// Print a next-step suggestion unless quiet.
    pub fn hint(&self, msg: &str) {
        if !self.quiet {
            println!("\n{msg}");
        }
    }

    /// Write the completion cache back to disk.
    pub async fn flush(&self) -> std::io::Result<()> {
        self.completion.lock().await.flush()
    }
}
