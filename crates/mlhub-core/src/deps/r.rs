//! R packages through a single `Rscript -e` call.

use async_trait::async_trait;
use mlhub_schema::{PackageRef, RSource};

use super::{
    BackendReport, CommandSpec, DependencyBackend, InstallContext, Job, package_names,
    record_outcome,
};
use crate::error::{HubError, Result};

const CRAN_MIRROR: &str = "https://cloud.r-project.org";
const SNAPSHOT_BASE: &str = "https://packagemanager.posit.co/cran";

/// Installs R packages from CRAN, a dated CRAN snapshot, or GitHub.
#[derive(Debug, Clone)]
pub struct RBackend {
    source: RSource,
}

impl RBackend {
    /// Backend for `source`.
    pub fn new(source: RSource) -> Self {
        Self { source }
    }

    fn repos(&self) -> String {
        match &self.source {
            RSource::CranSnapshot(date) => format!("{SNAPSHOT_BASE}/{date}"),
            RSource::Cran | RSource::GitHub => CRAN_MIRROR.to_string(),
        }
    }

    /// The R program installing `packages`. Packages already present in the
    /// library are skipped by the script itself.
    pub fn script(&self, packages: &[&PackageRef]) -> String {
        let mut lines = vec![
            format!("repos <- {}", r_str(&self.repos())),
            "have <- rownames(installed.packages())".to_string(),
        ];

        match self.source {
            RSource::GitHub => {
                let refs: Vec<String> = packages.iter().map(|p| r_str(&p.name)).collect();
                lines.push(ensure_remotes());
                lines.push(format!("refs <- c({})", refs.join(", ")));
                lines.push(
                    "base <- basename(sub(\"[@#].*$\", \"\", refs))".to_string(),
                );
                lines.push("todo <- refs[!(base %in% have)]".to_string());
                lines.push(
                    "if (length(todo)) remotes::install_github(todo, upgrade = \"never\")"
                        .to_string(),
                );
            }
            RSource::Cran | RSource::CranSnapshot(_) => {
                let (pinned, plain): (Vec<&PackageRef>, Vec<&PackageRef>) = packages
                    .iter()
                    .copied()
                    .partition(|p| p.pinned_version().is_some());

                if !plain.is_empty() {
                    let names: Vec<String> = plain.iter().map(|p| r_str(&p.name)).collect();
                    lines.push(format!("pkgs <- c({})", names.join(", ")));
                    lines.push("todo <- pkgs[!(pkgs %in% have)]".to_string());
                    lines.push("if (length(todo)) install.packages(todo, repos = repos)".to_string());
                }

                if !pinned.is_empty() {
                    lines.push(ensure_remotes());
                    for p in pinned {
                        let version = p.pinned_version().unwrap_or_default();
                        lines.push(format!(
                            "if (!({name} %in% have) || as.character(packageVersion({name})) != {ver}) \
                             remotes::install_version({name}, version = {ver}, repos = repos, upgrade = \"never\")",
                            name = r_str(&p.name),
                            ver = r_str(version),
                        ));
                    }
                }
            }
        }

        lines.join("\n")
    }
}

fn ensure_remotes() -> String {
    "if (!requireNamespace(\"remotes\", quietly = TRUE)) install.packages(\"remotes\", repos = repos)"
        .to_string()
}

/// Quote `s` as an R string literal.
fn r_str(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[async_trait]
impl DependencyBackend for RBackend {
    async fn install(&self, job: &Job, ctx: &InstallContext<'_>) -> Result<BackendReport> {
        let packages: Vec<&PackageRef> = package_names(&job.entries).collect();
        let mut report = BackendReport::default();
        if packages.is_empty() {
            return Ok(report);
        }

        if ctx.runner.which("Rscript").is_none() {
            return Err(HubError::BackendUnavailable {
                tool: "Rscript".to_string(),
                category: "R".to_string(),
            });
        }

        let names: Vec<String> = packages.iter().map(|p| p.name.clone()).collect();
        ctx.reporter.installing(ctx.model, &names.join(" "));

        let cmd = CommandSpec::new("Rscript").arg("-e").arg(self.script(&packages));
        let ok = ctx.runner.run(&cmd).await?;
        record_outcome(&mut report, ok, names, ctx.reporter, "R package install");
        Ok(report)
    }
}
