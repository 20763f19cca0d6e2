//! Removing packages, caches and archives.

use std::fs;
use std::path::PathBuf;

use mlhub_core::{HubError, Result};
use mlhub_schema::ModelName;

use crate::ops::Context;

/// What a removal did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The package directory was removed.
    Removed { path: PathBuf, cache_removed: bool },
    /// The model root was removed.
    RemovedAll(PathBuf),
    /// The user declined.
    Kept,
    /// There was nothing to remove.
    NothingToDo(PathBuf),
}

/// Remove one installed model, then offer to drop its cache.
pub fn remove_model(model: &str, ctx: &Context) -> Result<RemoveOutcome> {
    if !ctx.layout.is_installed(model) {
        return Err(HubError::NotInstalled(ModelName::from(model)));
    }

    let path = ctx.layout.package_dir(model);
    if !ctx
        .prompter
        .confirm(&format!("Remove '{}'", path.display()), true)?
    {
        return Ok(RemoveOutcome::Kept);
    }
    fs::remove_dir_all(&path)?;
    tracing::debug!(model, path = %path.display(), "removed package");

    let cache = ctx.layout.cache_dir(model);
    let mut cache_removed = false;
    if cache.is_dir()
        && ctx
            .prompter
            .confirm(&format!("Remove cache '{}' as well", cache.display()), false)?
    {
        fs::remove_dir_all(&cache)?;
        cache_removed = true;
    }

    Ok(RemoveOutcome::Removed {
        path,
        cache_removed,
    })
}

/// Remove the whole model root, caches included.
pub fn remove_all(ctx: &Context) -> Result<RemoveOutcome> {
    let root = ctx.layout.root().to_path_buf();
    if !root.is_dir() {
        return Ok(RemoveOutcome::NothingToDo(root));
    }

    let question = format!(
        "*Completely* remove all installed models in '{}'",
        root.display()
    );
    if !ctx.prompter.confirm(&question, true)? {
        return Ok(RemoveOutcome::Kept);
    }
    fs::remove_dir_all(&root)?;
    Ok(RemoveOutcome::RemovedAll(root))
}

/// Offer to delete each downloaded archive in the model root. Returns the
/// archives that were deleted.
pub fn clean_archives(ctx: &Context) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for archive in ctx.layout.archives()? {
        let question = format!("Remove model package archive '{}'", archive.display());
        if ctx.prompter.confirm(&question, true)? {
            fs::remove_file(&archive)?;
            removed.push(archive);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlhub_core::deps::SystemRunner;
    use mlhub_core::{HubLayout, NullReporter, ScriptedPrompter};
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    fn setup(answers: &[bool]) -> (TempDir, Context, Arc<ScriptedPrompter>) {
        let dir = tempdir().unwrap();
        let layout = HubLayout::new(dir.path().join("hub"));
        let prompter = Arc::new(ScriptedPrompter::new(answers.iter().copied()));
        let ctx = Context::new(
            layout,
            reqwest::Client::new(),
            "http://127.0.0.1:9/",
            Arc::new(NullReporter),
            prompter.clone(),
            Arc::new(SystemRunner),
        )
        .unwrap();
        (dir, ctx, prompter)
    }

    fn install_stub(ctx: &Context, name: &str) {
        let dir = ctx.layout.package_dir(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("MLHUB.yaml"), "meta:\n  name: rain\n").unwrap();
    }

    #[test]
    fn test_remove_without_cache_asks_once() {
        let (_dir, ctx, prompter) = setup(&[true]);
        install_stub(&ctx, "rain");

        let outcome = remove_model("rain", &ctx).unwrap();
        assert!(matches!(
            outcome,
            RemoveOutcome::Removed {
                cache_removed: false,
                ..
            }
        ));
        assert!(!ctx.layout.is_installed("rain"));
        assert_eq!(prompter.asked().len(), 1);
    }

    #[test]
    fn test_remove_offers_cache_when_present() {
        let (_dir, ctx, prompter) = setup(&[true, true]);
        install_stub(&ctx, "rain");
        fs::create_dir_all(ctx.layout.cache_dir("rain")).unwrap();

        let outcome = remove_model("rain", &ctx).unwrap();
        assert!(matches!(
            outcome,
            RemoveOutcome::Removed {
                cache_removed: true,
                ..
            }
        ));
        assert!(!ctx.layout.cache_dir("rain").exists());
        let asked = prompter.asked();
        assert_eq!(asked.len(), 2);
        assert!(asked[1].starts_with("Remove cache"));
    }

    #[test]
    fn test_declined_remove_keeps_package() {
        let (_dir, ctx, _) = setup(&[false]);
        install_stub(&ctx, "rain");
        assert_eq!(remove_model("rain", &ctx).unwrap(), RemoveOutcome::Kept);
        assert!(ctx.layout.is_installed("rain"));
    }

    #[test]
    fn test_remove_missing_model() {
        let (_dir, ctx, prompter) = setup(&[]);
        let err = remove_model("rain", &ctx).unwrap_err();
        assert!(matches!(err, HubError::NotInstalled(_)));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_remove_rejects_names_outside_the_root() {
        let (dir, ctx, prompter) = setup(&[]);
        install_stub(&ctx, "rain");
        fs::create_dir_all(ctx.layout.cache_dir("rain")).unwrap();

        for name in ["..", ".", "../hub", ".cache"] {
            let err = remove_model(name, &ctx).unwrap_err();
            assert!(matches!(err, HubError::NotInstalled(_)), "{name}");
        }
        assert!(prompter.asked().is_empty());
        assert!(dir.path().join("hub").is_dir());
        assert!(ctx.layout.is_installed("rain"));
        assert!(ctx.layout.cache_dir("rain").is_dir());
    }

    #[test]
    fn test_remove_all() {
        let (_dir, ctx, _) = setup(&[true]);
        assert!(matches!(
            remove_all(&ctx).unwrap(),
            RemoveOutcome::NothingToDo(_)
        ));

        install_stub(&ctx, "rain");
        assert!(matches!(
            remove_all(&ctx).unwrap(),
            RemoveOutcome::RemovedAll(_)
        ));
        assert!(!ctx.layout.root().exists());
    }

    #[test]
    fn test_clean_archives_asks_per_archive() {
        let (_dir, ctx, prompter) = setup(&[true, false]);
        ctx.layout.ensure_root().unwrap();
        let root = ctx.layout.root();
        fs::write(root.join("a_0.1.0.mlm"), b"a").unwrap();
        fs::write(root.join("b_0.1.0.mlm"), b"b").unwrap();
        fs::write(root.join("notes.txt"), b"c").unwrap();

        let removed = clean_archives(&ctx).unwrap();
        assert_eq!(removed, vec![root.join("a_0.1.0.mlm")]);
        assert!(root.join("b_0.1.0.mlm").exists());
        assert!(root.join("notes.txt").exists());
        assert_eq!(prompter.asked().len(), 2);
    }
}
