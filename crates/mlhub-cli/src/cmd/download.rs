//! Download command

use anyhow::Result;
use mlhub_core::package::load_installed;

use crate::ops::Context;

/// Large pre-built parts are fetched by a model's own commands; this only
/// checks the model is present and points at the next step.
pub fn download(ctx: &Context, model: &str) -> Result<()> {
    let installed = load_installed(&ctx.layout, model)?;
    tracing::debug!(model, path = %installed.path.display(), "download requested");
    ctx.hint(&format!(
        "To list the commands of the model:\n\n  $ ml commands {model}"
    ));
    Ok(())
}
