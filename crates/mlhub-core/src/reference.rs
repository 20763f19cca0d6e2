//! Reference Resolver
//!
//! Turns whatever the user passed to `ml install` into something fetchable:
//!
//! * a local archive path or an archive URL is used as is;
//! * a bare name is looked up in the registry;
//! * anything else must be a GitHub reference (`owner/repo[@ref][:path]`,
//!   a github.com URL, or an api.github.com zipball/contents URL), which
//!   yields a zipball URL plus the URL of its manifest.

use std::path::{Path, PathBuf};

use mlhub_schema::{EXT_MLM, MANIFEST_FILE, ModelName, ModelVersion};

use crate::completion::CompletionCache;
use crate::error::{HubError, Result};
use crate::paths::filename_from_url;
use crate::registry::RegistryClient;

const GITHUB_API: &str = "https://api.github.com";

const ARCHIVE_SUFFIXES: [&str; 5] = [".mlm", ".zip", ".tar.gz", ".tgz", ".tar"];

/// Whether `s` names an archive by its suffix.
pub fn is_archive(s: &str) -> bool {
    let lower = s.to_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Whether `s` is an absolute http(s) or ftp URL.
pub fn is_url(s: &str) -> bool {
    let lower = s.to_lowercase();
    ["http://", "https://", "ftp://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Recover `(name, version)` from a `name_version.mlm` (or `name-version.mlm`)
/// file name or URL.
///
/// # Example
///
/// ```
/// use mlhub_core::reference::interpret_mlm_name;
///
/// let (name, version) = interpret_mlm_name("https://x/rain_1.2.0.mlm").unwrap();
/// assert_eq!(name.as_str(), "rain");
/// assert_eq!(version.to_string(), "1.2.0");
/// ```
pub fn interpret_mlm_name(s: &str) -> Option<(ModelName, ModelVersion)> {
    let file = filename_from_url(s);
    let stem = file.strip_suffix(EXT_MLM)?;

    ['_', '-'].iter().find_map(|sep| {
        let (name, version) = stem.rsplit_once(*sep)?;
        let version = ModelVersion::parse(version).ok()?;
        (!name.is_empty()).then(|| (ModelName::from(name), version))
    })
}

/// A GitHub repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRef {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch, tag or commit; the default branch when `None`.
    pub git_ref: Option<String>,
    /// Path of the manifest inside the repository; `MLHUB.yaml` when `None`.
    pub manifest_path: Option<String>,
}

impl GitHubRef {
    /// Parse any of the supported GitHub reference forms.
    ///
    /// # Example
    ///
    /// ```
    /// use mlhub_core::reference::GitHubRef;
    ///
    /// let gh = GitHubRef::parse("mlhubber/audit@dev:doc/MLHUB.yaml").unwrap();
    /// assert_eq!(gh.archive_url(), "https://api.github.com/repos/mlhubber/audit/zipball/dev");
    /// assert_eq!(
    ///     gh.manifest_url(),
    ///     "https://api.github.com/repos/mlhubber/audit/contents/doc/MLHUB.yaml?ref=dev"
    /// );
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let lower = s.to_lowercase();

        if let Some(pos) = lower.find("api.github.com/repos/") {
            return Self::from_api_path(&s[pos + "api.github.com/repos/".len()..]);
        }
        if let Some(pos) = lower.find("github.com/") {
            if is_url(s) || pos == 0 || lower.starts_with("www.") {
                return Self::from_web_path(&s[pos + "github.com/".len()..]);
            }
        }
        if is_url(s) {
            return None;
        }
        Self::from_shorthand(s)
    }

    /// `owner/repo[@ref][:path]`
    fn from_shorthand(s: &str) -> Option<Self> {
        let (repo_part, path) = match s.split_once(':') {
            Some((repo, path)) => (repo, Some(path.trim_start_matches('/'))),
            None => (s, None),
        };
        let (slug, git_ref) = match repo_part.split_once('@') {
            Some((slug, r)) => (slug, Some(r)),
            None => (repo_part, None),
        };
        let (owner, repo) = slug.split_once('/')?;

        Self::build(owner, repo, git_ref, path)
    }

    /// `owner/repo[.git][/tree/<ref>[/<dir>]]` or `owner/repo/blob/<ref>/<path>`
    fn from_web_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let mut parts = path.trim_end_matches('/').splitn(5, '/');
        let owner = parts.next()?;
        let repo = parts.next()?.trim_end_matches(".git");

        match (parts.next(), parts.next(), parts.next()) {
            (None, ..) => Self::build(owner, repo, None, None),
            (Some("tree"), Some(git_ref), dir) => {
                let manifest = dir
                    .filter(|d| !d.is_empty())
                    .map(|d| format!("{d}/{MANIFEST_FILE}"));
                Self::build(owner, repo, Some(git_ref), manifest.as_deref())
            }
            (Some("blob"), Some(git_ref), Some(file)) => {
                Self::build(owner, repo, Some(git_ref), Some(file))
            }
            _ => None,
        }
    }

    /// `owner/repo/zipball[/<ref>]` or `owner/repo/contents/<path>[?ref=<ref>]`
    fn from_api_path(path: &str) -> Option<Self> {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };
        let mut parts = path.trim_end_matches('/').splitn(4, '/');
        let owner = parts.next()?;
        let repo = parts.next()?;

        match (parts.next(), parts.next()) {
            (Some("zipball"), git_ref) => Self::build(owner, repo, git_ref, None),
            (Some("contents"), file) => {
                let git_ref = query.and_then(|q| {
                    q.split('&').find_map(|kv| kv.strip_prefix("ref="))
                });
                Self::build(owner, repo, git_ref, file)
            }
            _ => None,
        }
    }

    fn build(owner: &str, repo: &str, git_ref: Option<&str>, path: Option<&str>) -> Option<Self> {
        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(repo) {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.filter(|r| !r.is_empty()).map(String::from),
            manifest_path: path.filter(|p| !p.is_empty()).map(String::from),
        })
    }

    /// Zipball URL of the repository at the requested ref.
    pub fn archive_url(&self) -> String {
        let mut url = format!("{GITHUB_API}/repos/{}/{}/zipball", self.owner, self.repo);
        if let Some(r) = &self.git_ref {
            url.push('/');
            url.push_str(r);
        }
        url
    }

    /// Contents-API URL of the manifest.
    pub fn manifest_url(&self) -> String {
        let path = self.manifest_path.as_deref().unwrap_or(MANIFEST_FILE);
        let mut url = format!(
            "{GITHUB_API}/repos/{}/{}/contents/{path}",
            self.owner, self.repo
        );
        if let Some(r) = &self.git_ref {
            url.push_str("?ref=");
            url.push_str(r);
        }
        url
    }
}

/// Where the package bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An archive already on disk.
    Local(PathBuf),
    /// An archive to download.
    Remote(String),
}

impl Source {
    /// Path or URL, for messages.
    pub fn location(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }

    /// File name of the archive.
    pub fn file_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Remote(url) => filename_from_url(url).to_string(),
        }
    }
}

/// The outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The archive to fetch.
    pub source: Source,
    /// Model name, when already known.
    pub name: Option<ModelName>,
    /// Model version, when already known.
    pub version: Option<ModelVersion>,
    /// Contents-API URL of the manifest for GitHub sources.
    pub manifest_url: Option<String>,
}

impl Resolution {
    /// Whether the source is a GitHub repository.
    pub fn is_github(&self) -> bool {
        self.manifest_url.is_some()
    }
}

/// Resolve a raw reference. Registry names seen along the way are recorded
/// in `completion`.
///
/// # Errors
///
/// Returns [`HubError::InvalidReference`] for a malformed reference or a
/// name missing from the registry. Registry failures propagate.
pub async fn resolve(
    reference: &str,
    registry: &RegistryClient,
    completion: &mut CompletionCache,
) -> Result<Resolution> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(HubError::invalid_reference(reference, "empty reference"));
    }

    let mut location = reference.to_string();
    let mut name = None;
    let mut version = None;

    if !is_archive(reference) && !is_url(reference) && !reference.contains('/') {
        let listing = registry.fetch().await?;
        completion.record_known_models(listing.names());

        let entry = listing.find(reference).ok_or_else(|| {
            HubError::invalid_reference(
                reference,
                format!("no model of that name in {}", registry.base()),
            )
        })?;
        location = entry.url.clone().ok_or_else(|| {
            HubError::invalid_reference(reference, "the registry entry has no URL")
        })?;
        name = Some(entry.name.clone());
        version = entry
            .version
            .as_deref()
            .and_then(|v| ModelVersion::parse(v).ok());
        tracing::debug!(%reference, url = %location, "resolved through registry");
    }

    resolve_location(reference, &location, name, version)
}

/// Resolve a location that is no longer a registry name.
///
/// # Errors
///
/// Returns [`HubError::InvalidReference`] for a malformed reference.
pub fn resolve_location(
    reference: &str,
    location: &str,
    name: Option<ModelName>,
    version: Option<ModelVersion>,
) -> Result<Resolution> {
    if !is_archive(location) {
        let gh = GitHubRef::parse(location).ok_or_else(|| {
            HubError::invalid_reference(
                reference,
                "not an archive, URL, registry name or GitHub repository",
            )
        })?;
        tracing::debug!(?gh, "resolved GitHub reference");
        return Ok(Resolution {
            source: Source::Remote(gh.archive_url()),
            name,
            version,
            manifest_url: Some(gh.manifest_url()),
        });
    }

    let source = if is_url(location) {
        Source::Remote(location.to_string())
    } else {
        let path = Path::new(location);
        if !path.is_file() {
            return Err(HubError::invalid_reference(reference, "no such archive file"));
        }
        Source::Local(path.to_path_buf())
    };

    Ok(Resolution {
        source,
        name,
        version,
        manifest_url: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::download;
    use crate::paths::HubLayout;
    use tempfile::tempdir;

    #[test]
    fn test_archive_and_url_predicates() {
        assert!(is_archive("rain_1.0.0.mlm"));
        assert!(is_archive("https://x.org/model.TAR.GZ"));
        assert!(is_archive("model.tgz"));
        assert!(!is_archive("mlhubber/audit"));
        assert!(is_url("HTTPS://x.org"));
        assert!(is_url("ftp://mirror/a.zip"));
        assert!(!is_url("github.com/a/b"));
    }

    #[test]
    fn test_interpret_mlm_name() {
        let (n, v) = interpret_mlm_name("rain_1.0.2.mlm").unwrap();
        assert_eq!(n, "rain");
        assert_eq!(v, ModelVersion::new(1, 0, 2));

        let (n, v) = interpret_mlm_name("/tmp/my_model-2.1.mlm").unwrap();
        assert_eq!(n, "my_model");
        assert_eq!(v, ModelVersion::new(2, 1, 0));

        let (n, _) = interpret_mlm_name("https://x/a/audit_kit_0.3.0.mlm").unwrap();
        assert_eq!(n, "audit_kit");

        assert!(interpret_mlm_name("rain.mlm").is_none());
        assert!(interpret_mlm_name("rain_1.0.zip").is_none());
    }

    #[test]
    fn test_github_shorthand() {
        let gh = GitHubRef::parse("mlhubber/audit").unwrap();
        assert_eq!(gh.archive_url(), "https://api.github.com/repos/mlhubber/audit/zipball");
        assert_eq!(
            gh.manifest_url(),
            "https://api.github.com/repos/mlhubber/audit/contents/MLHUB.yaml"
        );

        let gh = GitHubRef::parse("mlhubber/audit:doc/MLHUB.yaml").unwrap();
        assert_eq!(gh.manifest_path.as_deref(), Some("doc/MLHUB.yaml"));
        assert_eq!(gh.git_ref, None);
    }

    #[test]
    fn test_github_web_urls() {
        let gh = GitHubRef::parse("https://github.com/mlhubber/audit.git").unwrap();
        assert_eq!(gh.repo, "audit");

        let gh = GitHubRef::parse("https://github.com/mlhubber/audit/tree/dev/doc").unwrap();
        assert_eq!(gh.git_ref.as_deref(), Some("dev"));
        assert_eq!(gh.manifest_path.as_deref(), Some("doc/MLHUB.yaml"));

        let gh = GitHubRef::parse("github.com/mlhubber/audit/blob/v2/pkg/MLHUB.yaml").unwrap();
        assert_eq!(gh.git_ref.as_deref(), Some("v2"));
        assert_eq!(gh.manifest_path.as_deref(), Some("pkg/MLHUB.yaml"));

        assert!(GitHubRef::parse("https://github.com/mlhubber/audit/issues/3").is_none());
    }

    #[test]
    fn test_github_api_urls() {
        let gh = GitHubRef::parse("https://api.github.com/repos/o/r/zipball/main").unwrap();
        assert_eq!(gh.git_ref.as_deref(), Some("main"));

        let gh =
            GitHubRef::parse("https://api.github.com/repos/o/r/contents/x/MLHUB.yaml?ref=dev")
                .unwrap();
        assert_eq!(gh.manifest_path.as_deref(), Some("x/MLHUB.yaml"));
        assert_eq!(gh.git_ref.as_deref(), Some("dev"));
        assert_eq!(
            gh.manifest_url(),
            "https://api.github.com/repos/o/r/contents/x/MLHUB.yaml?ref=dev"
        );
    }

    #[test]
    fn test_not_github() {
        assert!(GitHubRef::parse("https://example.com/o/r").is_none());
        assert!(GitHubRef::parse("just/too/many").is_none());
        assert!(GitHubRef::parse("bad owner/repo").is_none());
    }

    #[test]
    fn test_resolve_archive_url_and_local_file() {
        let r = resolve_location("x", "https://x.org/rain_1.0.0.mlm", None, None).unwrap();
        assert_eq!(r.source, Source::Remote("https://x.org/rain_1.0.0.mlm".into()));
        assert!(!r.is_github());
        assert_eq!(r.source.file_name(), "rain_1.0.0.mlm");

        let dir = tempdir().unwrap();
        let file = dir.path().join("m.zip");
        std::fs::write(&file, "").unwrap();
        let r = resolve_location("m.zip", file.to_str().unwrap(), None, None).unwrap();
        assert_eq!(r.source, Source::Local(file));

        assert!(matches!(
            resolve_location("gone.zip", "/nonexistent/gone.zip", None, None),
            Err(HubError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_resolve_github_reference() {
        let r = resolve_location("o/r@v1", "o/r@v1", None, None).unwrap();
        assert!(r.is_github());
        assert_eq!(
            r.source,
            Source::Remote("https://api.github.com/repos/o/r/zipball/v1".into())
        );
    }

    #[tokio::test]
    async fn test_resolve_registry_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/Packages.yaml")
            .with_body(
                "- meta:\n    name: rain\n    version: 1.2.0\n    url: https://x.org/rain_1.2.0.mlm\n\
                 - meta:\n    name: audit\n    version: 2.0\n    url: mlhubber/audit\n",
            )
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let layout = HubLayout::new(dir.path());
        let mut completion = CompletionCache::load(&layout).unwrap();
        let registry = RegistryClient::new(download::client().unwrap(), &server.url());

        let r = resolve("rain", &registry, &mut completion).await.unwrap();
        assert_eq!(r.name.as_deref(), Some("rain"));
        assert_eq!(r.version, Some(ModelVersion::new(1, 2, 0)));
        assert_eq!(r.source, Source::Remote("https://x.org/rain_1.2.0.mlm".into()));
        assert_eq!(completion.models().collect::<Vec<_>>(), vec!["audit", "rain"]);

        let r = resolve("audit", &registry, &mut completion).await.unwrap();
        assert!(r.is_github());

        assert!(matches!(
            resolve("nosuch", &registry, &mut completion).await,
            Err(HubError::InvalidReference { .. })
        ));
    }
}
