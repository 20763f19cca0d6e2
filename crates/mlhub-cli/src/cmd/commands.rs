//! Commands command

use anyhow::Result;
use mlhub_core::package::load_installed;

use crate::ops::Context;
use crate::ui::theme::inline_title;

/// List the commands an installed model declares.
pub async fn commands(ctx: &Context, model: &str, name_only: bool) -> Result<()> {
    let installed = load_installed(&ctx.layout, model)?;
    let manifest = &installed.manifest;

    ctx.completion
        .lock()
        .await
        .record_known_commands(manifest.command_names());

    if name_only {
        for name in manifest.command_names() {
            println!("{name}");
        }
        return Ok(());
    }

    match manifest.title.as_deref().map(inline_title) {
        Some(title) if !title.is_empty() => println!(
            "The '{model}' model ({title}) supports the following commands:"
        ),
        _ => println!("The '{model}' model supports the following commands:"),
    }
    for command in &manifest.commands {
        println!("\n  $ ml {} {model}", command.name);
        if let Some(description) = &command.description {
            println!("    {description}");
        }
    }

    ctx.hint(&format!(
        "Model dependencies are installed with:\n\n  $ ml configure {model}"
    ));
    Ok(())
}
