//! Installed command

use anyhow::Result;
use mlhub_core::package::inventory;

use crate::ops::Context;

/// List the models installed under the model root.
pub async fn installed(ctx: &Context, name_only: bool) -> Result<()> {
    let root = ctx.layout.root();

    if name_only {
        for name in ctx.layout.installed_names()? {
            println!("{name}");
        }
        return Ok(());
    }

    if !root.is_dir() {
        println!(
            "Found 0 models installed. '{}' does not exist.",
            root.display()
        );
        ctx.hint("To list the models available:\n\n  $ ml available");
        return Ok(());
    }

    let inv = inventory(&ctx.layout)?;
    let total = inv.models.len() + inv.broken.len();
    let noun = if total == 1 { "model" } else { "models" };
    println!(
        "Found {total} {noun} installed in '{}'.\n",
        root.display()
    );

    for model in &inv.models {
        let m = &model.manifest;
        println!(
            "{:<18} {:<8} {}",
            m.name.as_str(),
            m.version.to_string(),
            m.title.as_deref().unwrap_or("")
        );
    }

    {
        let mut completion = ctx.completion.lock().await;
        completion.record_known_models(inv.models.iter().map(|m| m.manifest.name.as_str()));
        for model in &inv.models {
            completion.record_known_commands(model.manifest.command_names());
        }
    }

    if !inv.broken.is_empty() {
        let (noun, verb) = if inv.broken.len() == 1 {
            ("package", "is")
        } else {
            ("packages", "are")
        };
        ctx.reporter.warning(&format!(
            "Of which {} model {noun} {verb} broken:",
            inv.broken.len()
        ));
        for name in &inv.broken {
            eprintln!("    {name}");
        }
        ctx.hint("To remove a broken package:\n\n  $ ml remove <model>");
    }

    if inv.models.is_empty() {
        ctx.hint("To list the models available:\n\n  $ ml available");
    } else {
        ctx.hint("To list the commands of a model:\n\n  $ ml commands <model>");
    }
    Ok(())
}
