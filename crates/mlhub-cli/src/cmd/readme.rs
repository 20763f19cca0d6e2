//! Readme command

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use mlhub_core::HubError;
use mlhub_core::package::load_installed;
use mlhub_schema::ModelName;

use crate::ops::Context;

const README_FILES: [&str; 3] = ["README.txt", "README.md", "README.rst"];

/// The first README present in `dir`, in order of preference.
pub fn find_readme(dir: &std::path::Path) -> Option<PathBuf> {
    README_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Print an installed model's README.
pub fn readme(ctx: &Context, model: &str) -> Result<()> {
    let installed = load_installed(&ctx.layout, model)?;
    let path = find_readme(&installed.path)
        .ok_or_else(|| HubError::ReadmeNotFound(ModelName::from(model)))?;

    let text = fs::read_to_string(&path)?;
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }

    ctx.hint(&format!(
        "To configure the model:\n\n  $ ml configure {model}"
    ));
    Ok(())
}
