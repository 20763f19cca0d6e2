//! Python packages through pip, pip3, conda or the system package manager.

use async_trait::async_trait;
use mlhub_schema::{PackageRef, PythonSource};

use super::system::SystemBackend;
use super::{
    BackendReport, CommandSpec, DependencyBackend, InstallContext, Job, package_names,
    record_outcome,
};
use crate::error::{HubError, Result};

/// Installs Python packages with the tool named by the category.
#[derive(Debug, Clone, Copy)]
pub struct PythonBackend {
    source: PythonSource,
}

impl PythonBackend {
    /// Backend for `source`.
    pub fn new(source: PythonSource) -> Self {
        Self { source }
    }

    fn command(self, specs: &[String]) -> CommandSpec {
        match self.source {
            PythonSource::Conda => CommandSpec::new("conda").args(["install", "-y"]),
            PythonSource::Pip3 => CommandSpec::new("pip3").arg("install"),
            PythonSource::Pip | PythonSource::System => CommandSpec::new("pip").arg("install"),
        }
        .args(specs.iter().cloned())
    }
}

#[async_trait]
impl DependencyBackend for PythonBackend {
    async fn install(&self, job: &Job, ctx: &InstallContext<'_>) -> Result<BackendReport> {
        if self.source == PythonSource::System {
            return SystemBackend::with_prefix("python3-").install(job, ctx).await;
        }

        let specs: Vec<String> = package_names(&job.entries).map(PackageRef::pip_spec).collect();
        let mut report = BackendReport::default();
        if specs.is_empty() {
            return Ok(report);
        }

        let cmd = self.command(&specs);
        if ctx.runner.which(&cmd.program).is_none() {
            return Err(HubError::BackendUnavailable {
                tool: cmd.program,
                category: "python".to_string(),
            });
        }

        ctx.reporter.installing(ctx.model, &specs.join(" "));
        let ok = ctx.runner.run(&cmd).await?;
        let what = format!("{} install", cmd.program);
        record_outcome(&mut report, ok, specs, ctx.reporter, &what);
        Ok(report)
    }
}
