//! Installed packages on disk.

use std::fs;
use std::path::{Path, PathBuf};

use mlhub_schema::{Manifest, ModelName};

use crate::error::{HubError, Result};
use crate::paths::{HubLayout, find_manifest};

/// Read and normalise a manifest file.
///
/// # Errors
///
/// Returns [`HubError::ManifestMalformed`] when the text does not parse.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)?;
    Manifest::from_yaml(&text).map_err(|source| HubError::ManifestMalformed {
        location: path.display().to_string(),
        source,
    })
}

/// Read the manifest at the root of `dir`.
///
/// # Errors
///
/// Returns [`HubError::ManifestMissing`] when `dir` has no manifest.
pub fn read_manifest_in(dir: &Path) -> Result<Manifest> {
    let path = find_manifest(dir).ok_or_else(|| HubError::ManifestMissing(dir.to_path_buf()))?;
    read_manifest(&path)
}

/// A package found under the model root.
#[derive(Debug, Clone)]
pub struct InstalledModel {
    /// Package directory.
    pub path: PathBuf,
    /// Its manifest.
    pub manifest: Manifest,
}

/// Check `name` is installed and load its manifest.
///
/// # Errors
///
/// Returns [`HubError::NotInstalled`] when the package directory is absent.
pub fn load_installed(layout: &HubLayout, name: &str) -> Result<InstalledModel> {
    if !layout.is_installed(name) {
        return Err(HubError::NotInstalled(ModelName::from(name)));
    }
    let path = layout.package_dir(name);
    let manifest = read_manifest_in(&path)?;
    Ok(InstalledModel { path, manifest })
}

/// Result of scanning the model root.
#[derive(Debug, Default)]
pub struct Inventory {
    /// Packages with a readable manifest, sorted by directory name.
    pub models: Vec<InstalledModel>,
    /// Directory names whose manifest is missing or malformed.
    pub broken: Vec<String>,
}

/// Scan every installed package. Unreadable manifests are tallied, not raised.
///
/// # Errors
///
/// Fails only if the model root cannot be listed.
pub fn inventory(layout: &HubLayout) -> Result<Inventory> {
    let mut inv = Inventory::default();
    for name in layout.installed_names()? {
        match read_manifest_in(&layout.package_dir(&name)) {
            Ok(manifest) => inv.models.push(InstalledModel {
                path: layout.package_dir(&name),
                manifest,
            }),
            Err(e) => {
                tracing::warn!(model = %name, error = %e, "skipping broken package");
                inv.broken.push(name);
            }
        }
    }
    Ok(inv)
}
