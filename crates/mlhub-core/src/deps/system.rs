//! Distribution packages through `apt-get`.

use async_trait::async_trait;

use super::{
    BackendReport, CommandSpec, DependencyBackend, InstallContext, Job, package_names,
    record_outcome,
};
use crate::error::{HubError, Result};

/// Installs distribution packages, optionally under a name prefix.
#[derive(Debug, Clone, Default)]
pub struct SystemBackend {
    prefix: Option<&'static str>,
}

impl SystemBackend {
    /// Backend that installs `<prefix><name>` for every entry.
    pub fn with_prefix(prefix: &'static str) -> Self {
        Self {
            prefix: Some(prefix),
        }
    }

    fn package_name(&self, name: &str) -> String {
        match self.prefix {
            Some(prefix) if !name.starts_with(prefix) => format!("{prefix}{name}"),
            _ => name.to_string(),
        }
    }

    /// Install `names`, skipping those dpkg already knows about.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::BackendUnavailable`] without `apt-get`, and an I/O error
    /// if a command cannot be spawned.
    pub async fn install_packages(
        &self,
        names: Vec<String>,
        ctx: &InstallContext<'_>,
    ) -> Result<BackendReport> {
        let mut report = BackendReport::default();
        if names.is_empty() {
            return Ok(report);
        }

        if ctx.runner.which("apt-get").is_none() {
            return Err(HubError::BackendUnavailable {
                tool: "apt-get".to_string(),
                category: "system".to_string(),
            });
        }

        let can_query = ctx.runner.which("dpkg").is_some();
        let mut missing = Vec::new();
        for name in names {
            let installed = can_query
                && ctx
                    .runner
                    .check(&CommandSpec::new("dpkg").args(["-s", name.as_str()]))
                    .await?;
            if installed {
                report.satisfied.push(name);
            } else {
                missing.push(name);
            }
        }

        if missing.is_empty() {
            ctx.reporter.info("System dependencies already installed");
            return Ok(report);
        }

        let cmd = if ctx.runner.which("sudo").is_some() {
            CommandSpec::new("sudo").arg("apt-get")
        } else {
            CommandSpec::new("apt-get")
        }
        .args(["install", "-y"])
        .args(missing.iter().cloned());

        ctx.reporter.installing(ctx.model, &missing.join(" "));
        let ok = ctx.runner.run(&cmd).await?;
        record_outcome(&mut report, ok, missing, ctx.reporter, "apt-get install");
        Ok(report)
    }
}

#[async_trait]
impl DependencyBackend for SystemBackend {
    async fn install(&self, job: &Job, ctx: &InstallContext<'_>) -> Result<BackendReport> {
        let names = package_names(&job.entries)
            .map(|p| self.package_name(&p.name))
            .collect();
        self.install_packages(names, ctx).await
    }
}
