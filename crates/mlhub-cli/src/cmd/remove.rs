//! Remove command

use anyhow::Result;

use crate::ops::Context;
use crate::ops::remove::{RemoveOutcome, remove_all, remove_model};

/// Remove one model, or every model when none is named.
pub fn remove(ctx: &Context, model: Option<&str>) -> Result<()> {
    let outcome = match model {
        Some(model) => remove_model(model, ctx)?,
        None => remove_all(ctx)?,
    };

    match outcome {
        RemoveOutcome::Removed { path, cache_removed } => {
            tracing::debug!(path = %path.display(), cache_removed, "model removed");
            ctx.hint("To list the models still installed:\n\n  $ ml installed");
        }
        RemoveOutcome::RemovedAll(root) => {
            tracing::debug!(root = %root.display(), "model root removed");
        }
        RemoveOutcome::NothingToDo(root) => println!(
            "The local model folder '{}' does not exist. Nothing to do.",
            root.display()
        ),
        RemoveOutcome::Kept => {}
    }
    Ok(())
}
