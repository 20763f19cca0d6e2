//! Raw files placed into the package tree.
//!
//! A source is either an absolute URL (downloaded) or a path relative to the
//! base directory (copied; glob patterns allowed). The destination keeps the
//! declared relative path. Destinations under `cache/` are stored in the
//! package's cache directory and symlinked into the package, so large
//! artifacts survive a reinstall.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mlhub_schema::{DependencyEntry, FileDep};

use super::{BackendReport, DependencyBackend, InstallContext, Job};
use crate::error::Result;
use crate::io::download;
use crate::paths::filename_from_url;
use crate::reference::is_url;

const CACHE_PREFIX: &str = "cache/";

/// Installs file entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesBackend;

#[async_trait]
impl DependencyBackend for FilesBackend {
    async fn install(&self, job: &Job, ctx: &InstallContext<'_>) -> Result<BackendReport> {
        let files: Vec<FileDep> = job
            .entries
            .iter()
            .map(|e| match e {
                DependencyEntry::File(f) => f.clone(),
                DependencyEntry::Package(p) => FileDep {
                    source: p.name.clone(),
                    dest: None,
                },
            })
            .collect();
        install_files(&files, ctx).await
    }
}

/// Place every file of `files` into the package directory of `ctx.model`.
///
/// # Errors
///
/// Never fails at present. A file that cannot be fetched or placed is
/// warned about and listed in [`BackendReport::failed`].
pub async fn install_files(files: &[FileDep], ctx: &InstallContext<'_>) -> Result<BackendReport> {
    let package_dir = ctx.layout.package_dir(ctx.model);
    let cache_dir = ctx.layout.cache_dir(ctx.model);
    let base = ctx.base_dir.map_or_else(|| package_dir.clone(), Path::to_path_buf);
    let places = Places {
        package_dir: &package_dir,
        cache_dir: &cache_dir,
    };

    let mut report = BackendReport::default();
    for file in files {
        let label = label(file);
        let outcome = if is_url(&file.source) {
            fetch_url(file, &places, ctx).await
        } else {
            copy_local(file, &base, &places)
        };

        match outcome {
            Ok(placed) if placed.is_empty() => {
                ctx.reporter.warning(&format!("No files match '{}'", file.source));
                report.failed.push(label);
            }
            Ok(placed) => {
                for dest in &placed {
                    tracing::debug!(dest = %dest.display(), "placed file");
                }
                report.installed.push(label);
            }
            Err(e) => {
                ctx.reporter
                    .warning(&format!("Could not install '{}': {e}", file.source));
                report.failed.push(label);
            }
        }
    }
    Ok(report)
}

fn label(file: &FileDep) -> String {
    match &file.dest {
        Some(dest) => format!("{} -> {dest}", file.source),
        None => file.source.clone(),
    }
}

struct Places<'a> {
    package_dir: &'a Path,
    cache_dir: &'a Path,
}

impl Places<'_> {
    /// Where `rel` really lives, and the link to create in the package when
    /// it is cached.
    fn target(&self, rel: &str) -> (PathBuf, Option<PathBuf>) {
        let rel = rel.trim_start_matches("./");
        match rel.strip_prefix(CACHE_PREFIX) {
            Some(rest) => (self.cache_dir.join(rest), Some(self.package_dir.join(rel))),
            None => (self.package_dir.join(rel), None),
        }
    }
}

/// Destination relative path for a source; a dest ending in `/` is a folder.
fn dest_rel(declared: Option<&str>, fallback: &str) -> String {
    match declared {
        Some(d) if d.ends_with('/') => {
            let name = Path::new(fallback)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{d}{name}")
        }
        Some(d) => d.to_string(),
        None => fallback.to_string(),
    }
}

async fn fetch_url(
    file: &FileDep,
    places: &Places<'_>,
    ctx: &InstallContext<'_>,
) -> std::result::Result<Vec<PathBuf>, String> {
    let rel = dest_rel(file.dest.as_deref(), filename_from_url(&file.source));
    let (target, link) = places.target(&rel);

    download::download_to(ctx.client, &file.source, &target, &rel, ctx.reporter)
        .await
        .map_err(|e| e.to_string())?;
    if let Some(link) = link {
        symlink_into(&target, &link).map_err(|e| e.to_string())?;
    }
    Ok(vec![target])
}

fn copy_local(
    file: &FileDep,
    base: &Path,
    places: &Places<'_>,
) -> std::result::Result<Vec<PathBuf>, String> {
    let source = file.source.trim_start_matches("./");
    let mut placed = Vec::new();

    if source.contains(['*', '?', '[']) {
        let pattern = base.join(source);
        let matches = glob::glob(&pattern.to_string_lossy()).map_err(|e| e.to_string())?;
        for path in matches.filter_map(std::result::Result::ok) {
            let Ok(rel_src) = path.strip_prefix(base) else {
                continue;
            };
            let rel_src = rel_src.to_string_lossy();
            let rel = match file.dest.as_deref() {
                Some(d) => {
                    let folder = format!("{}/", d.trim_end_matches('/'));
                    dest_rel(Some(folder.as_str()), &rel_src)
                }
                None => rel_src.into_owned(),
            };
            placed.push(place(&path, &rel, places).map_err(|e| e.to_string())?);
        }
        return Ok(placed);
    }

    let path = base.join(source);
    if !path.exists() {
        return Err(format!("'{}' does not exist", path.display()));
    }
    let rel = dest_rel(file.dest.as_deref(), source);
    placed.push(place(&path, &rel, places).map_err(|e| e.to_string())?);
    Ok(placed)
}

fn place(src: &Path, rel: &str, places: &Places<'_>) -> io::Result<PathBuf> {
    let (target, link) = places.target(rel);
    if src != target {
        copy_any(src, &target)?;
    }
    if let Some(link) = link {
        symlink_into(&target, &link)?;
    }
    Ok(target)
}

fn copy_any(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        let options = fs_extra::dir::CopyOptions::new().content_only(true).overwrite(true);
        fs_extra::dir::copy(src, dest, &options).map_err(io::Error::other)?;
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

fn symlink_into(target: &Path, link: &Path) -> io::Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)?;
    }
    if link.symlink_metadata().is_ok() {
        if link.is_dir() && !link.is_symlink() {
            fs::remove_dir_all(link)?;
        } else {
            fs::remove_file(link)?;
        }
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)?;
    }
    #[cfg(not(unix))]
    {
        copy_any(target, link)?;
    }
    Ok(())
}
