//! Install command

use anyhow::Result;

use crate::ops::Context;
use crate::ops::install::install_model;
use crate::ui::theme::group_thousands;

/// Install a model from any supported reference.
pub async fn install(ctx: &Context, reference: &str) -> Result<()> {
    let report = install_model(reference, ctx).await?;

    if !ctx.quiet {
        println!(
            "\nExtracted '{}' into\n'{}' ({} bytes).",
            report.archive,
            report.path.display(),
            group_thousands(report.size)
        );
    }
    ctx.hint(&format!(
        "To install the model's dependencies:\n\n  $ ml configure {}",
        report.name
    ));
    Ok(())
}
