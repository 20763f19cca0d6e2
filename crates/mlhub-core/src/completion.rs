//! Shell completion cache.
//!
//! Two plain-text files under the model root list every model and command
//! name mlhub has seen, one per line, for the bash completion script. The
//! cache is loaded once per invocation, updated in memory and written back by
//! [`CompletionCache::flush`] only when something new was recorded.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::paths::HubLayout;

/// In-memory view of the completion files.
#[derive(Debug)]
pub struct CompletionCache {
    models_path: PathBuf,
    commands_path: PathBuf,
    models: BTreeSet<String>,
    commands: BTreeSet<String>,
    dirty: bool,
}

impl CompletionCache {
    /// Read the cache files under `layout`. Missing files read as empty.
    ///
    /// # Errors
    ///
    /// Fails if a cache file exists but cannot be read.
    pub fn load(layout: &HubLayout) -> io::Result<Self> {
        let models_path = layout.model_completion_file();
        let commands_path = layout.command_completion_file();
        Ok(Self {
            models: read_names(&models_path)?,
            commands: read_names(&commands_path)?,
            models_path,
            commands_path,
            dirty: false,
        })
    }

    /// Add model names.
    pub fn record_known_models<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = extend(&mut self.models, names);
        self.dirty |= added;
    }

    /// Add command names.
    pub fn record_known_commands<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = extend(&mut self.commands, names);
        self.dirty |= added;
    }

    /// Known model names, sorted.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }

    /// Known command names, sorted.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Write the files back if anything changed.
    ///
    /// # Errors
    ///
    /// Fails if the model root cannot be created or a file cannot be written.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        write_names(&self.models_path, &self.models)?;
        write_names(&self.commands_path, &self.commands)?;
        self.dirty = false;
        tracing::debug!(
            models = self.models.len(),
            commands = self.commands.len(),
            "completion cache flushed"
        );
        Ok(())
    }
}

fn extend<I, S>(set: &mut BTreeSet<String>, names: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut added = false;
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() {
            added |= set.insert(name.to_string());
        }
    }
    added
}

fn read_names(path: &Path) -> io::Result<BTreeSet<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(e),
    }
}

fn write_names(path: &Path, names: &BTreeSet<String>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = String::new();
    for name in names {
        text.push_str(name);
        text.push('\n');
    }
    fs::write(path, text)
}
