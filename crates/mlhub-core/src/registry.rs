//! Registry client: fetches `Packages.yaml` from the model repository.

use mlhub_schema::{REGISTRY_FILE, Registry};
use reqwest::Client;

use crate::error::{HubError, Result};
use crate::io::download;

/// Default model repository.
pub const DEFAULT_REPO: &str = "https://mlhub.ai/";

/// Reads the registry listing from a repository base URL.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base: String,
}

impl RegistryClient {
    /// Client for the repository at `base`. A missing trailing slash is added.
    pub fn new(client: Client, base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { client, base }
    }

    /// Repository base URL, always ending in `/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full URL of the listing.
    pub fn listing_url(&self) -> String {
        format!("{}{REGISTRY_FILE}", self.base)
    }

    /// Download and parse the listing.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::FetchFailed`] when the listing cannot be downloaded
    /// and [`HubError::ManifestMalformed`] when it does not parse.
    pub async fn fetch(&self) -> Result<Registry> {
        let url = self.listing_url();
        tracing::debug!(%url, "fetching registry");

        let text = download::fetch_text(&self.client, &url)
            .await
            .map_err(|e| HubError::fetch(&url, e))?;

        Registry::from_yaml(&text).map_err(|source| HubError::ManifestMalformed {
            location: url,
            source,
        })
    }
}
