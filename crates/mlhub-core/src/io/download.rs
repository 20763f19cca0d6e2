//! Streaming HTTP downloads with progress reporting.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Transport-level failures.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the downloaded bytes failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build the HTTP client used for every request.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub fn client() -> Result<Client, DownloadError> {
    Ok(Client::builder().user_agent(crate::USER_AGENT).build()?)
}

/// Stream `url` into `dest`, reporting progress under `label`.
///
/// Returns the number of bytes written. A partial file is removed on failure.
///
/// # Errors
///
/// Fails on a transport error, a non-success status or a write error.
pub async fn download_to<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &R,
) -> Result<u64, DownloadError> {
    tracing::debug!(%url, dest = %dest.display(), "downloading");

    let result = stream_to_file(client, url, dest, label, reporter).await;
    if result.is_err() {
        tokio::fs::remove_file(dest).await.ok();
        reporter.failed(label, "download failed");
    }
    result
}

async fn stream_to_file<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let total = response.content_length();
    reporter.downloading(label, 0, total);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(label, downloaded, total);
    }

    file.flush().await?;
    Ok(downloaded)
}

/// Fetch a small text document.
///
/// # Errors
///
/// Fails on a transport error or a non-success status.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, DownloadError> {
    tracing::debug!(%url, "fetching text");
    Ok(client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?)
}

/// Fetch and decode a JSON document.
///
/// # Errors
///
/// Fails on a transport error, a non-success status or a body of the
/// wrong shape.
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, DownloadError> {
    let text = fetch_text(client, url).await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::RecordingReporter;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_download_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rain_1.0.0.mlm")
            .with_status(200)
            .with_body("archive bytes")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested/rain_1.0.0.mlm");
        let url = format!("{}/rain_1.0.0.mlm", server.url());

        let n = download_to(&client().unwrap(), &url, &dest, "rain", &crate::NullReporter)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(n, 13);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "archive bytes");
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing.zip");
        let reporter = RecordingReporter::default();
        let url = format!("{}/missing.zip", server.url());

        let err = download_to(&client().unwrap(), &url, &dest, "missing", &reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Http(_)));
        assert!(!dest.exists());
        assert_eq!(reporter.messages(), vec!["failed: missing download failed"]);
    }

    #[tokio::test]
    async fn test_fetch_json() {
        #[derive(serde::Deserialize)]
        struct Contents {
            download_url: String,
        }

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contents")
            .with_body(r#"{"download_url": "https://raw.example/MLHUB.yaml", "size": 10}"#)
            .create_async()
            .await;

        let c: Contents = fetch_json(&client().unwrap(), &format!("{}/contents", server.url()))
            .await
            .unwrap();
        assert_eq!(c.download_url, "https://raw.example/MLHUB.yaml");
    }
}
