//! Package Fetcher
//!
//! Downloads (when remote) and unpacks a package archive inside a scoped
//! working directory, then promotes a lone wrapper directory so the manifest
//! sits at the top of the unpacked tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reqwest::Client;

use crate::Reporter;
use crate::error::{HubError, Result};
use crate::io::{download, extract};
use crate::reference::Source;

/// Bring `source` into `workdir`, downloading it if remote.
///
/// Returns the local archive path. Local sources are used in place.
///
/// # Errors
///
/// Returns [`HubError::FetchFailed`] when a remote download fails.
pub async fn materialize<R: Reporter + ?Sized>(
    client: &Client,
    source: &Source,
    workdir: &Path,
    label: &str,
    reporter: &R,
) -> Result<PathBuf> {
    match source {
        Source::Local(path) => Ok(path.clone()),
        Source::Remote(url) => {
            let mut file_name = source.file_name();
            if file_name.is_empty() {
                file_name = "package".to_string();
            }
            let dest = workdir.join(file_name);
            download::download_to(client, url, &dest, label, reporter)
                .await
                .map_err(|e| HubError::fetch(url, e))?;
            Ok(dest)
        }
    }
}

/// Unpack `archive` into `dest` and promote a single wrapper directory.
///
/// # Errors
///
/// Returns [`HubError::FetchFailed`] for an unreadable archive.
pub fn unpack_with_promote(archive: &Path, dest: &Path) -> Result<()> {
    extract::extract_auto(archive, dest)
        .map_err(|e| HubError::fetch(archive.display().to_string(), e))?;
    promote(dest)?;
    Ok(())
}

/// If `dir` holds exactly one entry and it is a directory, move that
/// directory's contents up into `dir`.
///
/// Returns whether anything moved. A tree whose manifest is already at the
/// top is left alone, so applying this twice to a flat tree is a no-op.
///
/// # Errors
///
/// Fails if `dir` cannot be listed or an entry cannot be moved.
pub fn promote(dir: &Path) -> io::Result<bool> {
    let entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    let [only] = entries.as_slice() else {
        return Ok(false);
    };
    if !only.file_type()?.is_dir() {
        return Ok(false);
    }

    // Rename the wrapper out of the way first so a child sharing its name
    // can land in `dir`.
    let wrapper = unused_name(dir, ".mlhub-promote");
    fs::rename(only.path(), &wrapper)?;

    for child in fs::read_dir(&wrapper)? {
        let child = child?;
        fs::rename(child.path(), dir.join(child.file_name()))?;
    }
    fs::remove_dir(&wrapper)?;

    tracing::debug!(dir = %dir.display(), "promoted wrapper directory");
    Ok(true)
}

fn unused_name(dir: &Path, stem: &str) -> PathBuf {
    let mut candidate = dir.join(stem);
    let mut n = 0;
    while candidate.exists() {
        n += 1;
        candidate = dir.join(format!("{stem}-{n}"));
    }
    candidate
}
