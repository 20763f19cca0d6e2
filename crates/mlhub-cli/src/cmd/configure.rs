//! Configure command

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use mlhub_core::deps::{install_plan, plan};
use mlhub_core::dispatch::{DispatchOutcome, Invocation, execute, interpreter_for};
use mlhub_core::package::load_installed;
use mlhub_core::paths::find_manifest;

use crate::ops::Context;

const CONFIGURE_SCRIPTS: [&str; 3] = ["configure.sh", "configure.R", "configure.py"];

/// Install a model's declared dependencies, then run its configure script.
pub async fn configure(ctx: &Context, model: &str) -> Result<()> {
    let installed = load_installed(&ctx.layout, model)?;
    let manifest = &installed.manifest;

    let plan = plan(&manifest.dependencies, &manifest.language);
    if !plan.is_empty() {
        let report = install_plan(&plan, &ctx.install_context(model, None)).await?;
        tracing::debug!(
            model,
            installed = report.installed.len(),
            failed = report.failed.len(),
            "dependencies processed"
        );
    }

    let configured = match find_configure_script(&installed.path) {
        Some(script) => {
            run_configure_script(ctx, model, &installed.path, script).await?;
            true
        }
        None => false,
    };

    if !configured {
        if manifest.dependencies.is_empty() {
            if !ctx.quiet {
                println!("No configuration provided (maybe none is required).");
            }
        } else if !ctx.quiet {
            println!(
                "No configuration script provided for this model. \
                 The following dependencies are required:\n"
            );
            if let Some(text) = dependencies_yaml(&installed.path) {
                print!("{text}");
            }
        }
    }

    ctx.hint(&format!(
        "To list the commands of the model:\n\n  $ ml commands {model}"
    ));
    Ok(())
}

/// First configure script present in the package, in order of preference.
pub fn find_configure_script(dir: &Path) -> Option<PathBuf> {
    CONFIGURE_SCRIPTS
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

async fn run_configure_script(
    ctx: &Context,
    model: &str,
    package_dir: &Path,
    script: PathBuf,
) -> Result<()> {
    ctx.reporter.section("Running configure script");
    let inv = Invocation {
        model: model.into(),
        command: "configure".to_string(),
        interpreter: interpreter_for(&script).or(Some("sh")),
        script,
        working_dir: package_dir.to_path_buf(),
        args: Vec::new(),
    };
    let cwd = std::env::current_dir()?;
    match execute(&inv, &cwd).await? {
        DispatchOutcome::Success { stderr } => {
            eprint!("{stderr}");
            Ok(())
        }
        DispatchOutcome::Failed { code, stderr } => {
            eprint!("{stderr}");
            match code {
                Some(code) => bail!("configure script for '{model}' exited with status {code}"),
                None => bail!("configure script for '{model}' was terminated"),
            }
        }
    }
}

/// The `dependencies` section of the package manifest, as written.
fn dependencies_yaml(package_dir: &Path) -> Option<String> {
    let path = find_manifest(package_dir)?;
    let text = std::fs::read_to_string(path).ok()?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&text).ok()?;
    let deps = doc
        .get("dependencies")
        .or_else(|| doc.get("meta").and_then(|meta| meta.get("dependencies")))?;
    serde_yaml::to_string(deps).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_configure_script_preference() {
        let dir = tempdir().unwrap();
        assert!(find_configure_script(dir.path()).is_none());

        fs::write(dir.path().join("configure.py"), "").unwrap();
        assert!(find_configure_script(dir.path()).unwrap().ends_with("configure.py"));

        fs::write(dir.path().join("configure.sh"), "").unwrap();
        assert!(find_configure_script(dir.path()).unwrap().ends_with("configure.sh"));
    }

    #[test]
    fn test_dependencies_yaml_keeps_manifest_shape() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("MLHUB.yaml"),
            "meta:\n  name: rain\ndependencies:\n  cran: magrittr, rattle\n",
        )
        .unwrap();
        let text = dependencies_yaml(dir.path()).unwrap();
        assert!(text.contains("cran: magrittr, rattle"));
    }
}
