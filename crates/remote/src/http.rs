//! Graph-style HTTP drive client.
//!
//! Talks to a Microsoft-Graph-compatible drive API: folder listings under
//! `/drives/{drive}/root:/{path}:/children` (paginated through
//! `@odata.nextLink`) and content downloads under `/items/{id}/content`.

use crate::error::RemoteError;
use crate::store::{RemoteEntry, RemoteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Source of pre-acquired bearer tokens.
///
/// Token acquisition and refresh are the authentication collaborator's
/// responsibility; the pipeline only needs a token per call.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, RemoteError>;
}

/// Fixed token handed over at process start (e.g. from an env var).
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, RemoteError> {
        Ok(self.0.clone())
    }
}

/// Remote store backed by a Graph-style drive API.
pub struct GraphDriveStore {
    client: reqwest::Client,
    base_url: String,
    drive_id: String,
    tokens: Box<dyn TokenSource>,
}

#[derive(Deserialize)]
struct ListingPage {
    #[serde(default)]
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct DriveItem {
    id: String,
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(rename = "lastModifiedDateTime")]
    last_modified: Option<DateTime<Utc>>,
    folder: Option<serde_json::Value>,
}

impl GraphDriveStore {
    pub fn new(
        base_url: impl Into<String>,
        drive_id: impl Into<String>,
        tokens: Box<dyn TokenSource>,
        call_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            drive_id: drive_id.into(),
            tokens,
        })
    }

    fn listing_url(&self, folder_path: &str) -> String {
        let trimmed = folder_path.trim_matches('/');
        if trimmed.is_empty() {
            format!("{}/drives/{}/root/children", self.base_url, self.drive_id)
        } else {
            let encoded: Vec<String> = trimmed.split('/').map(encode_segment).collect();
            format!(
                "{}/drives/{}/root:/{}:/children",
                self.base_url,
                self.drive_id,
                encoded.join("/")
            )
        }
    }

    async fn get(&self, url: &str, operation: &str) -> Result<reqwest::Response, RemoteError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| classify_transport(e, operation))?;
        classify_status(response, operation).await
    }
}

#[async_trait]
impl RemoteStore for GraphDriveStore {
    async fn list_children(&self, folder_path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut entries = Vec::new();
        let mut url = self.listing_url(folder_path);

        loop {
            let operation = format!("listing {folder_path}");
            let response = self.get(&url, &operation).await?;
            let page: ListingPage = response
                .json()
                .await
                .map_err(|e| RemoteError::Protocol(format!("invalid listing payload: {e}")))?;

            for item in page.value {
                let is_folder = item.folder.is_some();
                entries.push(RemoteEntry {
                    id: item.id,
                    name: item.name,
                    is_folder,
                    size: if is_folder { 0 } else { item.size.unwrap_or(0) },
                    modified_at: item.last_modified,
                });
            }

            match page.next_link {
                Some(next) => {
                    debug!(folder = folder_path, "Following listing pagination");
                    url = next;
                }
                None => break,
            }
        }

        Ok(entries)
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, RemoteError> {
        let url = format!(
            "{}/drives/{}/items/{}/content",
            self.base_url, self.drive_id, file_id
        );
        let operation = format!("download {file_id}");
        let response = self.get(&url, &operation).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| RemoteError::Transport(format!("cannot create {}: {e}", dest.display())))?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(classify_transport(e, &operation));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(dest).await;
                return Err(RemoteError::Transport(format!(
                    "write to {} failed: {e}",
                    dest.display()
                )));
            }
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| RemoteError::Transport(format!("flush {} failed: {e}", dest.display())))?;
        Ok(written)
    }
}

fn classify_transport(e: reqwest::Error, operation: &str) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout(operation.to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

async fn classify_status(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    match code {
        401 | 403 => Err(RemoteError::Auth { status: code }),
        404 => Err(RemoteError::NotFound(operation.to_string())),
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            Err(RemoteError::RateLimited { retry_after_secs })
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            let message = message.chars().take(200).collect();
            Err(RemoteError::Server {
                status: code,
                message,
            })
        }
    }
}

/// Percent-encode one path segment (RFC 3986 unreserved characters pass
/// through untouched).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn store() -> GraphDriveStore {
        GraphDriveStore::new(
            "https://graph.example.com/v1.0",
            "drive123",
            Box::new(StaticTokenSource::new("tok")),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn root_listing_url() {
        assert_eq!(
            store().listing_url("/"),
            "https://graph.example.com/v1.0/drives/drive123/root/children"
        );
    }

    #[test]
    fn nested_listing_url_is_encoded() {
        assert_eq!(
            store().listing_url("/Documents partages/Études"),
            "https://graph.example.com/v1.0/drives/drive123/root:/Documents%20partages/%C3%89tudes:/children"
        );
    }

    #[test]
    fn encode_segment_passes_unreserved() {
        assert_eq!(encode_segment("Lot_04-DPGF.xlsx"), "Lot_04-DPGF.xlsx");
        assert_eq!(encode_segment("a b"), "a%20b");
    }
}
