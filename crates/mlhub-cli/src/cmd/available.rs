//! Available command

use anyhow::Result;

use crate::ops::Context;

/// List the models the repository provides.
pub async fn available(ctx: &Context, name_only: bool) -> Result<()> {
    let registry = ctx.registry.fetch().await?;
    ctx.completion
        .lock()
        .await
        .record_known_models(registry.names());

    if name_only {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    if !ctx.quiet {
        println!(
            "The repository '{}' provides the following models:\n",
            ctx.registry.base()
        );
    }
    for entry in &registry.entries {
        println!(
            "{:<18} {:<8} {}",
            entry.name.as_str(),
            entry.version.as_deref().unwrap_or(""),
            entry.title.as_deref().unwrap_or("")
        );
    }

    ctx.hint("To install a model:\n\n  $ ml install <model>");
    Ok(())
}
