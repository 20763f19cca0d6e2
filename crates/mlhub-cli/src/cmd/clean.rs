//! Clean command

use anyhow::Result;

use crate::ops::Context;
use crate::ops::remove::clean_archives;

/// Offer to delete downloaded model archives.
pub fn clean(ctx: &Context) -> Result<()> {
    let removed = clean_archives(ctx)?;
    if !removed.is_empty() {
        ctx.reporter
            .success(&format!("Removed {} archive(s).", removed.len()));
    }
    Ok(())
}
