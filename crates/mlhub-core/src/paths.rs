//! Filesystem layout under the model root.

use dirs::home_dir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mlhub_schema::{EXT_MLM, LEGACY_MANIFEST_FILE, MANIFEST_FILE, ModelName};

/// Returns the model root, or None if the user's home cannot be resolved.
pub fn try_mlhub_home() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os("MLHUB_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".mlhub"))
}

/// Directory structure under the model root (`~/.mlhub`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubLayout {
    root: PathBuf,
}

impl HubLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `MLHUB_HOME`, else `~/.mlhub`.
    ///
    /// # Errors
    ///
    /// Fails when neither `MLHUB_HOME` nor a home directory is available.
    pub fn from_env() -> io::Result<Self> {
        try_mlhub_home().map(Self::new).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine home directory; set MLHUB_HOME",
            )
        })
    }

    /// The model root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the model root if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    pub fn ensure_root(&self) -> io::Result<&Path> {
        fs::create_dir_all(&self.root)?;
        Ok(&self.root)
    }

    /// Installed package directory: root/<name>
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Per-package cache: root/.cache/<name>
    pub fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join(".cache").join(name)
    }

    /// Completion list of known model names.
    pub fn model_completion_file(&self) -> PathBuf {
        self.root.join(".model_completion")
    }

    /// Completion list of known command names.
    pub fn command_completion_file(&self) -> PathBuf {
        self.root.join(".command_completion")
    }

    /// Whether a package directory exists for `name`. Names that could
    /// leave the root, and hidden entries such as `.cache`, never count.
    pub fn is_installed(&self, name: &str) -> bool {
        ModelName::is_valid(name) && self.package_dir(name).is_dir()
    }

    /// Names of installed packages, sorted. Hidden and private entries and
    /// the shared `R` library folder are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the model root exists but cannot be listed.
    pub fn installed_names(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "R" || name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Downloaded `.mlm` archives sitting in the root, sorted.
    ///
    /// # Errors
    ///
    /// Fails if the model root exists but cannot be listed.
    pub fn archives(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut archives: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(std::ffi::OsStr::to_str)
                    .is_some_and(|n| n.ends_with(EXT_MLM))
            })
            .collect();
        archives.sort();
        Ok(archives)
    }
}

/// Locate the manifest at the root of a package directory.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    [MANIFEST_FILE, LEGACY_MANIFEST_FILE]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Extract the filename from a URL, ignoring any query string.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Total size in bytes of all files under `dir`.
pub fn dir_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_installed_names_skips_special_entries() {
        let dir = tempdir().unwrap();
        let layout = HubLayout::new(dir.path());
        for name in ["rain", "audit", "R", ".cache", "_tmp"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(layout.installed_names().unwrap(), vec!["audit", "rain"]);
        assert!(layout.is_installed("rain"));
        assert!(!layout.is_installed("stray.txt"));
    }

    #[test]
    fn test_names_outside_the_root_are_never_installed() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("hub");
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::create_dir(dir.path().join("victim")).unwrap();
        let layout = HubLayout::new(&root);

        for name in ["..", ".", "../victim", ".cache", ""] {
            assert!(!layout.is_installed(name), "{name}");
        }
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = tempdir().unwrap();
        let layout = HubLayout::new(dir.path().join("absent"));
        assert!(layout.installed_names().unwrap().is_empty());
        assert!(layout.archives().unwrap().is_empty());
    }

    #[test]
    fn test_archives_only_mlm_files() {
        let dir = tempdir().unwrap();
        let layout = HubLayout::new(dir.path());
        fs::write(dir.path().join("rain_1.0.0.mlm"), "").unwrap();
        fs::write(dir.path().join("notes.zip"), "").unwrap();
        fs::create_dir(dir.path().join("dir.mlm")).unwrap();

        let archives = layout.archives().unwrap();
        assert_eq!(archives, vec![dir.path().join("rain_1.0.0.mlm")]);
    }

    #[test]
    fn test_layout_paths() {
        let layout = HubLayout::new("/hub");
        assert_eq!(layout.package_dir("rain"), PathBuf::from("/hub/rain"));
        assert_eq!(layout.cache_dir("rain"), PathBuf::from("/hub/.cache/rain"));
        assert_eq!(
            layout.model_completion_file(),
            PathBuf::from("/hub/.model_completion")
        );
    }

    #[test]
    fn test_find_manifest_prefers_current_name() {
        let dir = tempdir().unwrap();
        assert!(find_manifest(dir.path()).is_none());
        fs::write(dir.path().join(LEGACY_MANIFEST_FILE), "").unwrap();
        assert_eq!(
            find_manifest(dir.path()).unwrap(),
            dir.path().join(LEGACY_MANIFEST_FILE)
        );
        fs::write(dir.path().join(MANIFEST_FILE), "").unwrap();
        assert_eq!(
            find_manifest(dir.path()).unwrap(),
            dir.path().join(MANIFEST_FILE)
        );
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/a/rain_1.0.mlm"), "rain_1.0.mlm");
        assert_eq!(filename_from_url("https://x.org/a/b.zip?raw=true"), "b.zip");
        assert_eq!(
            filename_from_url("https://api.github.com/repos/o/r/zipball/dev"),
            "dev"
        );
    }

    #[test]
    fn test_dir_size_counts_nested_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a"), [0u8; 10]).unwrap();
        fs::write(dir.path().join("sub/b"), [0u8; 5]).unwrap();
        assert_eq!(dir_size(dir.path()), 15);
    }
}
