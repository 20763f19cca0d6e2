//! Install Orchestrator
//!
//! Sequences one model install:
//!
//! 1. resolve the reference to an archive (and, for GitHub, a manifest URL);
//! 2. recover the version when resolution did not supply one, from the
//!    `.mlm` file name, the GitHub manifest, or the unpacked archive;
//! 3. check for a same-named installation and confirm the downgrade,
//!    replace or upgrade;
//! 4. fetch and unpack, unless step 2 already did;
//! 5. remove the old installation and lay the package out: either the
//!    manifest plus its declared file list, or the whole unpacked tree;
//! 6. record the new model and command names for completion.
//!
//! All downloads and unpacking happen in a temporary directory that is
//! dropped on every exit path. A layout that fails part way is removed, so
//! the model root never holds a half-installed package. Dependency
//! installation is left to `ml configure`.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mlhub_core::deps::files::install_files;
use mlhub_core::fetch::{materialize, unpack_with_promote};
use mlhub_core::io::download;
use mlhub_core::package::read_manifest_in;
use mlhub_core::paths::{dir_size, find_manifest};
use mlhub_core::reference::{self, Resolution, Source, interpret_mlm_name};
use mlhub_core::{HubError, Result};
use mlhub_schema::{FileDep, MANIFEST_FILE, Manifest, ModelName, ModelVersion};
use serde::Deserialize;

use crate::ops::Context;

/// What an install produced.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Installed model name.
    pub name: ModelName,
    /// Installed model version.
    pub version: ModelVersion,
    /// Installed package directory.
    pub path: PathBuf,
    /// File name of the archive that was unpacked.
    pub archive: String,
    /// Installed size in bytes.
    pub size: u64,
}

/// How a requested version relates to the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The installed version is newer.
    Downgrade,
    /// Same version.
    Replace,
    /// The installed version is older.
    Upgrade,
}

impl Conflict {
    /// Compare the `installed` version against the `requested` one.
    pub fn between(installed: &ModelVersion, requested: &ModelVersion) -> Self {
        match installed.cmp(requested) {
            Ordering::Greater => Self::Downgrade,
            Ordering::Equal => Self::Replace,
            Ordering::Less => Self::Upgrade,
        }
    }

    /// The confirmation question for this conflict.
    pub fn question(self, name: &str, installed: &ModelVersion, requested: &ModelVersion) -> String {
        match self {
            Self::Downgrade => format!(
                "Downgrade '{name}' from version '{installed}' to version '{requested}'"
            ),
            Self::Replace => {
                format!("Replace '{name}' version '{installed}' with version '{requested}'")
            }
            Self::Upgrade => format!(
                "Upgrade '{name}' from version '{installed}' to version '{requested}'"
            ),
        }
    }
}

/// Install the model `reference` points at.
pub async fn install_model(reference: &str, ctx: &Context) -> Result<InstallReport> {
    let resolution = {
        let mut completion = ctx.completion.lock().await;
        reference::resolve(reference, &ctx.registry, &mut completion).await?
    };
    tracing::info!(?resolution, "resolved");
    install_resolution(reference, resolution, ctx).await
}

/// Install from an already resolved reference.
pub async fn install_resolution(
    reference: &str,
    resolution: Resolution,
    ctx: &Context,
) -> Result<InstallReport> {
    let Resolution {
        source,
        mut name,
        mut version,
        manifest_url,
    } = resolution;

    let archive = source.file_name();
    let workdir = tempfile::Builder::new().prefix("mlhub-").tempdir()?;
    let unpacked = workdir.path().join("package");
    let mut manifest: Option<Manifest> = None;
    let mut manifest_text: Option<String> = None;

    // Version recovery.
    if version.is_none() {
        if let Some((n, v)) = interpret_mlm_name(&source.location()) {
            name = Some(n);
            version = Some(v);
        } else if let Some(url) = &manifest_url {
            let (m, text) = fetch_remote_manifest(ctx, url).await?;
            manifest = Some(m);
            manifest_text = Some(text);
        } else {
            fetch_and_unpack(ctx, &source, workdir.path(), &unpacked, &archive).await?;
            manifest = Some(read_manifest_in(&unpacked)?);
        }

        if let Some(m) = &manifest {
            name = Some(m.name.clone());
            version = Some(m.version);
        }
    }

    let (Some(name), Some(version)) = (name, version) else {
        return Err(HubError::invalid_reference(
            reference,
            "could not determine the model name and version",
        ));
    };
    if !ModelName::is_valid(&name) {
        return Err(HubError::invalid_reference(
            reference,
            format!("'{name}' is not a valid model name"),
        ));
    }
    ctx.completion
        .lock()
        .await
        .record_known_models([name.as_str()]);

    // Conflict check. The old installation stays until the new one is fetched.
    let install_path = ctx.layout.package_dir(&name);
    let replacing = install_path.exists();
    if replacing {
        confirm_overwrite(ctx, &name, &version, &install_path)?;
    }

    if !unpacked.exists() {
        fetch_and_unpack(ctx, &source, workdir.path(), &unpacked, &archive).await?;
    }

    let manifest = match (manifest, &manifest_url) {
        (Some(m), _) => m,
        (None, Some(url)) => {
            let (m, text) = fetch_remote_manifest(ctx, url).await?;
            manifest_text = Some(text);
            m
        }
        (None, None) => read_manifest_in(&unpacked)?,
    };

    if replacing {
        tracing::info!(path = %install_path.display(), "removing existing installation");
        fs::remove_dir_all(&install_path)?;
    }

    // Layout.
    ctx.layout.ensure_root()?;
    let laid_out = match &manifest.files {
        Some(files) => {
            tracing::debug!(count = files.len(), "installing declared file list");
            lay_out_files(ctx, &name, files, manifest_text.as_deref(), &unpacked, &install_path)
                .await
        }
        None => move_tree(&unpacked, &install_path),
    };
    if let Err(e) = laid_out {
        if install_path.exists() {
            tracing::warn!(path = %install_path.display(), "removing partial installation");
            fs::remove_dir_all(&install_path)?;
        }
        return Err(e);
    }

    let installed = read_manifest_in(&install_path)?;
    ctx.completion
        .lock()
        .await
        .record_known_commands(installed.command_names());

    let size = dir_size(&install_path);
    ctx.reporter.done(&name, &version.to_string(), Some(size));

    Ok(InstallReport {
        name,
        version,
        path: install_path,
        archive,
        size,
    })
}

fn confirm_overwrite(
    ctx: &Context,
    name: &ModelName,
    requested: &ModelVersion,
    path: &Path,
) -> Result<()> {
    match read_manifest_in(path) {
        Ok(existing) => {
            let conflict = Conflict::between(&existing.version, requested);
            let question = conflict.question(name, &existing.version, requested);
            if !ctx.prompter.confirm(&question, true)? {
                return Err(HubError::VersionConflictDeclined {
                    model: name.clone(),
                    installed: existing.version,
                    requested: *requested,
                });
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "installed package is unreadable");
            let question = format!("The installed '{name}' is broken ({e}). Replace it");
            if !ctx.prompter.confirm(&question, true)? {
                return Err(HubError::ReplaceDeclined(name.clone()));
            }
        }
    }
    Ok(())
}

async fn fetch_and_unpack(
    ctx: &Context,
    source: &Source,
    workdir: &Path,
    unpacked: &Path,
    label: &str,
) -> Result<()> {
    let archive = materialize(&ctx.client, source, workdir, label, ctx.reporter.as_ref()).await?;
    ctx.reporter.extracting(label);
    unpack_with_promote(&archive, unpacked)
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    download_url: String,
}

/// The raw-content URL behind a GitHub contents API URL.
async fn manifest_download_url(ctx: &Context, url: &str) -> Result<String> {
    download::fetch_json::<ContentsEntry>(&ctx.client, url)
        .await
        .map(|entry| entry.download_url)
        .map_err(|e| HubError::fetch(url, e))
}

/// The manifest behind a GitHub contents API URL, with its text as served.
async fn fetch_remote_manifest(ctx: &Context, url: &str) -> Result<(Manifest, String)> {
    let raw = manifest_download_url(ctx, url).await?;
    let text = download::fetch_text(&ctx.client, &raw)
        .await
        .map_err(|e| HubError::fetch(&raw, e))?;
    let manifest = Manifest::from_yaml(&text).map_err(|source| HubError::ManifestMalformed {
        location: url.to_string(),
        source,
    })?;
    Ok((manifest, text))
}

/// Lay out a package that declares its file list: the manifest plus the
/// listed files, nothing else.
async fn lay_out_files(
    ctx: &Context,
    name: &ModelName,
    files: &[FileDep],
    manifest_text: Option<&str>,
    unpacked: &Path,
    install_path: &Path,
) -> Result<()> {
    fs::create_dir(install_path)?;
    place_manifest(manifest_text, unpacked, install_path)?;
    install_files(files, &ctx.install_context(name, Some(unpacked))).await?;
    Ok(())
}

/// Put the manifest at the root of `install_path`: the remote text when the
/// manifest was fetched separately, else the file from the unpacked archive.
fn place_manifest(manifest_text: Option<&str>, unpacked: &Path, install_path: &Path) -> Result<()> {
    if let Some(text) = manifest_text {
        fs::write(install_path.join(MANIFEST_FILE), text)?;
        return Ok(());
    }

    let local =
        find_manifest(unpacked).ok_or_else(|| HubError::ManifestMissing(unpacked.to_path_buf()))?;
    let file_name = local
        .file_name()
        .map_or_else(|| MANIFEST_FILE.into(), ToOwned::to_owned);
    fs::copy(&local, install_path.join(file_name))?;
    Ok(())
}

/// Move the unpacked tree to `to`, which must not exist yet.
fn move_tree(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", to.display()),
        )
        .into());
    }

    if let Err(e) = fs::rename(from, to) {
        tracing::debug!(error = %e, "rename failed, moving by copy");
        fs::create_dir_all(to)?;
        let options = fs_extra::dir::CopyOptions::new().content_only(true);
        fs_extra::dir::move_dir(from, to, &options).map_err(io::Error::other)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlhub_core::deps::SystemRunner;
    use mlhub_core::{HubLayout, RecordingReporter, ScriptedPrompter};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        dir: TempDir,
        layout: HubLayout,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let layout = HubLayout::new(dir.path().join("hub"));
            Self { dir, layout }
        }

        fn ctx(&self, answers: &[bool]) -> (Context, Arc<ScriptedPrompter>) {
            let prompter = Arc::new(ScriptedPrompter::new(answers.iter().copied()));
            let ctx = Context::new(
                self.layout.clone(),
                reqwest::Client::new(),
                "http://127.0.0.1:9/",
                Arc::new(RecordingReporter::default()),
                prompter.clone(),
                Arc::new(SystemRunner),
            )
            .unwrap();
            (ctx, prompter)
        }

        /// Write a zip archive with every entry under a wrapper directory.
        fn archive(&self, file_name: &str, entries: &[(&str, &str)]) -> PathBuf {
            let path = self.dir.path().join(file_name);
            fs::write(&path, zip_bytes(entries)).unwrap();
            path
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default();
            for (name, body) in entries {
                zip.start_file(format!("wrapper-abc123/{name}"), opts).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn rain(version: &str) -> String {
        format!("meta:\n  name: rain\n  version: {version}\n  languages: R\ncommands: [demo, print]\n")
    }

    async fn install_local(ctx: &Context, path: &Path) -> Result<InstallReport> {
        install_model(&path.to_string_lossy(), ctx).await
    }

    #[tokio::test]
    async fn test_fresh_install_never_prompts() {
        let fx = Fixture::new();
        let (ctx, prompter) = fx.ctx(&[]);
        let archive = fx.archive(
            "rain_1.0.0.mlm",
            &[("MLHUB.yaml", &rain("1.0.0")), ("demo.R", "print(1)")],
        );

        let report = install_local(&ctx, &archive).await.unwrap();

        assert!(prompter.asked().is_empty());
        assert_eq!(report.name, "rain");
        assert_eq!(report.archive, "rain_1.0.0.mlm");
        assert!(report.size > 0);
        let pkg = fx.layout.package_dir("rain");
        assert!(pkg.join("MLHUB.yaml").is_file());
        assert!(pkg.join("demo.R").is_file());

        ctx.flush().await.unwrap();
        let commands = fs::read_to_string(fx.layout.command_completion_file()).unwrap();
        assert_eq!(commands, "demo\nprint\n");
        let models = fs::read_to_string(fx.layout.model_completion_file()).unwrap();
        assert_eq!(models, "rain\n");
    }

    #[tokio::test]
    async fn test_version_recovered_from_manifest() {
        let fx = Fixture::new();
        let (ctx, _) = fx.ctx(&[]);
        let archive = fx.archive("bundle.zip", &[("MLHUB.yaml", &rain("2.1.0"))]);

        let report = install_local(&ctx, &archive).await.unwrap();
        assert_eq!(report.version, ModelVersion::parse("2.1.0").unwrap());
        assert!(fx.layout.package_dir("rain").join("MLHUB.yaml").is_file());
    }

    #[tokio::test]
    async fn test_declined_replace_leaves_installation() {
        let fx = Fixture::new();
        let archive = fx.archive(
            "rain_1.0.0.mlm",
            &[("MLHUB.yaml", &rain("1.0.0")), ("demo.R", "print(1)")],
        );
        let (ctx, _) = fx.ctx(&[]);
        install_local(&ctx, &archive).await.unwrap();
        let marker = fx.layout.package_dir("rain").join("marker");
        fs::write(&marker, "kept").unwrap();

        let (ctx, prompter) = fx.ctx(&[false]);
        let err = install_local(&ctx, &archive).await.unwrap_err();

        assert!(matches!(err, HubError::VersionConflictDeclined { .. }));
        assert_eq!(err.exit_code(), 0);
        assert_eq!(
            prompter.asked(),
            vec!["Replace 'rain' version '1.0.0' with version '1.0.0'"]
        );
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_upgrade_replaces_directory() {
        let fx = Fixture::new();
        let old = fx.archive("rain_1.0.0.mlm", &[("MLHUB.yaml", &rain("1.0.0"))]);
        let new = fx.archive("rain_1.2.0.mlm", &[("MLHUB.yaml", &rain("1.2.0"))]);
        let (ctx, _) = fx.ctx(&[]);
        install_local(&ctx, &old).await.unwrap();
        fs::write(fx.layout.package_dir("rain").join("stale"), "x").unwrap();

        let (ctx, prompter) = fx.ctx(&[]);
        let report = install_local(&ctx, &new).await.unwrap();

        assert_eq!(report.version.to_string(), "1.2.0");
        assert!(prompter.asked()[0].starts_with("Upgrade 'rain' from version '1.0.0'"));
        assert!(!fx.layout.package_dir("rain").join("stale").exists());
    }

    #[tokio::test]
    async fn test_broken_installation_is_offered_for_replacement() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.layout.package_dir("rain")).unwrap();
        let archive = fx.archive("rain_1.0.0.mlm", &[("MLHUB.yaml", &rain("1.0.0"))]);

        let (ctx, prompter) = fx.ctx(&[false]);
        let err = install_local(&ctx, &archive).await.unwrap_err();
        assert!(matches!(err, HubError::ReplaceDeclined(_)));
        assert!(prompter.asked()[0].contains("broken"));
    }

    #[test]
    fn test_conflict_framing() {
        let v = |s: &str| ModelVersion::parse(s).unwrap();
        assert_eq!(Conflict::between(&v("1.10.0"), &v("1.2.0")), Conflict::Downgrade);
        assert_eq!(Conflict::between(&v("2.0.0"), &v("2.0.0")), Conflict::Replace);
        assert_eq!(Conflict::between(&v("1.0.0"), &v("1.0.1")), Conflict::Upgrade);
        assert_eq!(
            Conflict::Downgrade.question("rain", &v("1.10.0"), &v("1.2.0")),
            "Downgrade 'rain' from version '1.10.0' to version '1.2.0'"
        );
    }

    #[tokio::test]
    async fn test_file_list_layout() {
        let fx = Fixture::new();
        let manifest = "name: rain\nversion: 1.0.0\nlanguages: R\ncommands: [demo]\n\
                        dependencies:\n  files:\n    - demo.R\n    - data/*.csv\n";
        let archive = fx.archive(
            "rain_1.0.0.mlm",
            &[
                ("MLHUB.yaml", manifest),
                ("demo.R", "print(1)"),
                ("data/a.csv", "a"),
                ("notes.txt", "not listed"),
            ],
        );
        let (ctx, _) = fx.ctx(&[]);

        install_local(&ctx, &archive).await.unwrap();

        let pkg = fx.layout.package_dir("rain");
        assert!(pkg.join("MLHUB.yaml").is_file());
        assert!(pkg.join("demo.R").is_file());
        assert!(pkg.join("data/a.csv").is_file());
        assert!(!pkg.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_github_source_reads_manifest_through_contents_api() {
        let mut server = mockito::Server::new_async().await;
        let manifest = "name: audit\nversion: 0.3.0\nlanguages: py\ncommands: [train]\n\
                        files: [train.py]\n";
        let contents = format!(r#"{{"download_url": "{}/raw/MLHUB.yaml"}}"#, server.url());
        let contents_mock = server
            .mock("GET", "/repos/mlhubber/audit/contents/MLHUB.yaml")
            .with_body(contents)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/raw/MLHUB.yaml")
            .with_body(manifest)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/mlhubber/audit/zipball")
            .with_body(zip_bytes(&[
                ("MLHUB.yaml", manifest),
                ("train.py", "print('hi')"),
                ("README.md", "# audit"),
            ]))
            .create_async()
            .await;

        let fx = Fixture::new();
        let (ctx, _) = fx.ctx(&[]);
        let resolution = Resolution {
            source: Source::Remote(format!("{}/repos/mlhubber/audit/zipball", server.url())),
            name: None,
            version: None,
            manifest_url: Some(format!(
                "{}/repos/mlhubber/audit/contents/MLHUB.yaml",
                server.url()
            )),
        };

        let report = install_resolution("mlhubber/audit", resolution, &ctx)
            .await
            .unwrap();

        assert_eq!(report.name, "audit");
        let pkg = fx.layout.package_dir("audit");
        assert_eq!(fs::read_to_string(pkg.join("MLHUB.yaml")).unwrap(), manifest);
        assert!(pkg.join("train.py").is_file());
        assert!(!pkg.join("README.md").exists());
        contents_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_installation() {
        let fx = Fixture::new();
        let old = fx.archive("rain_1.0.0.mlm", &[("MLHUB.yaml", &rain("1.0.0"))]);
        let (ctx, _) = fx.ctx(&[]);
        install_local(&ctx, &old).await.unwrap();
        let marker = fx.layout.package_dir("rain").join("marker");
        fs::write(&marker, "kept").unwrap();

        let mut server = mockito::Server::new_async().await;
        let contents = format!(r#"{{"download_url": "{}/raw/MLHUB.yaml"}}"#, server.url());
        server
            .mock("GET", "/repos/mlhubber/rain/contents/MLHUB.yaml")
            .with_body(contents)
            .create_async()
            .await;
        server
            .mock("GET", "/raw/MLHUB.yaml")
            .with_body(rain("1.1.0"))
            .create_async()
            .await;
        server
            .mock("GET", "/repos/mlhubber/rain/zipball")
            .with_status(500)
            .create_async()
            .await;

        let (ctx, prompter) = fx.ctx(&[]);
        let resolution = Resolution {
            source: Source::Remote(format!("{}/repos/mlhubber/rain/zipball", server.url())),
            name: None,
            version: None,
            manifest_url: Some(format!(
                "{}/repos/mlhubber/rain/contents/MLHUB.yaml",
                server.url()
            )),
        };
        let err = install_resolution("mlhubber/rain", resolution, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::FetchFailed { .. }));
        assert!(prompter.asked()[0].starts_with("Upgrade 'rain'"));
        assert!(marker.exists());
        let kept = read_manifest_in(&fx.layout.package_dir("rain")).unwrap();
        assert_eq!(kept.version.to_string(), "1.0.0");
    }

    #[tokio::test]
    async fn test_manifest_name_cannot_escape_the_root() {
        let fx = Fixture::new();
        let victim = fx.dir.path().join("victim");
        fs::create_dir_all(&victim).unwrap();
        fs::write(victim.join("precious.txt"), "keep me").unwrap();
        let manifest = "name: ../victim\nversion: 1.0.0\nlanguages: sh\n";
        let archive = fx.archive("bundle.zip", &[("MLHUB.yaml", manifest)]);

        let (ctx, prompter) = fx.ctx(&[]);
        let err = install_local(&ctx, &archive).await.unwrap_err();

        assert!(matches!(err, HubError::ManifestMalformed { .. }));
        assert!(prompter.asked().is_empty());
        assert!(victim.join("precious.txt").is_file());
        assert!(!victim.join("MLHUB.yaml").exists());
    }

    #[tokio::test]
    async fn test_missing_archive_is_invalid_reference() {
        let fx = Fixture::new();
        let (ctx, _) = fx.ctx(&[]);
        let missing = fx.dir.path().join("nope_1.0.0.mlm");
        assert!(matches!(
            install_local(&ctx, &missing).await,
            Err(HubError::InvalidReference { .. })
        ));
    }
}
