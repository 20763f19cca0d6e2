//! Dependency Installer
//!
//! Planning is pure: [`plan`] assigns every flattened dependency group to one
//! backend (or records why it was skipped). Execution hands each job to its
//! [`DependencyBackend`], which submits all entries of the group in one go.
//! Backends skip what is already present, report individual failures as
//! warnings and only fail outright when their tool is missing.

pub mod files;
pub mod python;
pub mod r;
pub mod runner;
pub mod system;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use mlhub_schema::{Category, DependencyEntry, DependencyGroup, Language, PythonSource, RSource};
use reqwest::Client;

use crate::Reporter;
use crate::error::Result;
use crate::paths::HubLayout;
pub use runner::{CommandRunner, CommandSpec, SystemRunner};

/// Which installer handles a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Distribution packages.
    System,
    /// R packages from the given source.
    R(RSource),
    /// Python packages through the given tool.
    Python(PythonSource),
    /// Files placed in the package tree.
    Files,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::R(RSource::Cran) => write!(f, "R (CRAN)"),
            Self::R(RSource::CranSnapshot(date)) => write!(f, "R (CRAN {date})"),
            Self::R(RSource::GitHub) => write!(f, "R (GitHub)"),
            Self::Python(PythonSource::System) => write!(f, "python (system)"),
            Self::Python(PythonSource::Pip) => write!(f, "pip"),
            Self::Python(PythonSource::Pip3) => write!(f, "pip3"),
            Self::Python(PythonSource::Conda) => write!(f, "conda"),
            Self::Files => write!(f, "files"),
        }
    }
}

/// One group of entries bound for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Chosen backend.
    pub backend: Backend,
    /// Category path the group came from.
    pub path: Vec<String>,
    /// Entries, in document order.
    pub entries: Vec<DependencyEntry>,
}

/// A group no backend accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Category path the group came from.
    pub path: Vec<String>,
    /// Human-readable reason.
    pub reason: String,
    /// Entries that will not be installed.
    pub entries: Vec<DependencyEntry>,
}

/// Output of [`plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Groups with a backend.
    pub jobs: Vec<Job>,
    /// Groups without one.
    pub skipped: Vec<Skipped>,
}

impl Plan {
    /// Whether there is nothing to do and nothing to warn about.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.skipped.is_empty()
    }
}

/// Route each group to a backend. Groups without a category follow the
/// manifest language: R goes to CRAN, Python to pip.
pub fn plan(groups: &[DependencyGroup], language: &Language) -> Plan {
    let mut out = Plan::default();

    for group in groups {
        let backend = match group.category() {
            Category::Default => match language {
                Language::R => Ok(Backend::R(RSource::Cran)),
                Language::Python => Ok(Backend::Python(PythonSource::Pip)),
                other => Err(format!("no default installer for {other} dependencies")),
            },
            Category::System => Ok(Backend::System),
            Category::R(source) => Ok(Backend::R(source)),
            Category::Python(source) => Ok(Backend::Python(source)),
            Category::Files => Ok(Backend::Files),
            Category::Unknown(token) => Err(format!("unknown dependency category '{token}'")),
        };

        match backend {
            Ok(backend) => out.jobs.push(Job {
                backend,
                path: group.path.clone(),
                entries: group.entries.clone(),
            }),
            Err(reason) => out.skipped.push(Skipped {
                path: group.path.clone(),
                reason,
                entries: group.entries.clone(),
            }),
        }
    }

    out
}

/// What a backend did with its entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendReport {
    /// Newly installed.
    pub installed: Vec<String>,
    /// Already present, left alone.
    pub satisfied: Vec<String>,
    /// Attempted and failed.
    pub failed: Vec<String>,
}

impl BackendReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.installed.extend(other.installed);
        self.satisfied.extend(other.satisfied);
        self.failed.extend(other.failed);
    }
}

/// Everything a backend may touch.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Model whose dependencies are being installed.
    pub model: &'a str,
    /// Model root layout.
    pub layout: &'a HubLayout,
    /// Where relative file sources are resolved; defaults to the package
    /// directory.
    pub base_dir: Option<&'a Path>,
    /// HTTP client for file downloads.
    pub client: &'a Client,
    /// Subprocess runner.
    pub runner: &'a dyn CommandRunner,
    /// Progress sink.
    pub reporter: &'a dyn Reporter,
}

impl fmt::Debug for InstallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("model", &self.model)
            .field("layout", &self.layout)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

/// An installer for one dependency category.
#[async_trait]
pub trait DependencyBackend: Send + Sync {
    /// Install every entry of `job`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::BackendUnavailable`] when the installer program is absent.
    async fn install(&self, job: &Job, ctx: &InstallContext<'_>) -> Result<BackendReport>;
}

fn backend_for(backend: &Backend) -> Box<dyn DependencyBackend> {
    match backend {
        Backend::System => Box::new(system::SystemBackend::default()),
        Backend::R(source) => Box::new(r::RBackend::new(source.clone())),
        Backend::Python(source) => Box::new(python::PythonBackend::new(*source)),
        Backend::Files => Box::new(files::FilesBackend),
    }
}

/// Run every job of `plan` in order. Skipped groups are reported as
/// warnings. A missing tool stops the run.
///
/// # Errors
///
/// Stops at the first backend error.
pub async fn install_plan(plan: &Plan, ctx: &InstallContext<'_>) -> Result<BackendReport> {
    for skipped in &plan.skipped {
        let names: Vec<String> = skipped.entries.iter().map(ToString::to_string).collect();
        ctx.reporter.warning(&format!(
            "Skipping {}: {}",
            names.join(", "),
            skipped.reason
        ));
    }

    let mut report = BackendReport::default();
    for job in &plan.jobs {
        tracing::debug!(backend = %job.backend, entries = job.entries.len(), "installing dependency group");
        ctx.reporter.section(&format!("Installing {} dependencies", job.backend));
        let outcome = backend_for(&job.backend).install(job, ctx).await?;
        report.merge(outcome);
    }

    if !report.failed.is_empty() {
        ctx.reporter.warning(&format!(
            "Failed to install: {}",
            report.failed.join(", ")
        ));
    }
    Ok(report)
}

/// Package names of the entries, ignoring file entries.
pub(crate) fn package_names(entries: &[DependencyEntry]) -> impl Iterator<Item = &mlhub_schema::PackageRef> {
    entries.iter().filter_map(|e| match e {
        DependencyEntry::Package(p) => Some(p),
        DependencyEntry::File(_) => None,
    })
}

/// Record the outcome of one install command for `names`.
pub(crate) fn record_outcome(
    report: &mut BackendReport,
    ok: bool,
    names: Vec<String>,
    reporter: &dyn Reporter,
    what: &str,
) {
    if ok {
        reporter.done(what, &names.join(", "), None);
        report.installed.extend(names);
    } else {
        reporter.warning(&format!("{what} failed for: {}", names.join(", ")));
        report.failed.extend(names);
    }
}
