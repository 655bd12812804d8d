//! Download primitive
//!
//! The store treats fetching as opaque: given a URL and a destination
//! directory, leave the payload in that directory and report where.

use crate::error::{ArtifactError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Places the resource at `url` inside `dest_dir`
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download and return the path of the written file
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// File name a URL downloads to: its last path segment
pub fn file_name_for(url: &str) -> Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ArtifactError::Fetch {
            url: url.to_string(),
            reason: "URL has no file name".into(),
        })
}

/// Fetcher backed by `reqwest`, streaming the body to disk
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let fetch_err = |reason: String| ArtifactError::Fetch {
            url: url.to_string(),
            reason,
        };

        let target = dest_dir.join(file_name_for(url)?);
        info!(url, target = %target.display(), "Downloading artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;

        let mut file = tokio::fs::File::create(&target)
            .await
            .map_err(|e| ArtifactError::io(&target, e))?;

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| fetch_err(e.to_string()))?;
            written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| ArtifactError::io(&target, e))?;
        }
        file.flush()
            .await
            .map_err(|e| ArtifactError::io(&target, e))?;

        debug!(url, bytes = written, "Download finished");
        Ok(target)
    }
}
