//! Fetching finished remote artifacts into the output directory.

use crate::error::{ParlaError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Download `url` to `dest`.
///
/// The body is streamed into a `.part` file that is renamed on success, so
/// `dest` never holds a truncated video.
#[instrument(skip(dest), fields(dest = %dest.display()))]
pub async fn download(url: &str, dest: &Path, timeout: Duration) -> Result<PathBuf> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ParlaError::Download(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ParlaError::Download(format!("HTTP {} for {}", status, url)));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = dest.with_extension("part");
    let written = match write_body(response, &partial).await {
        Ok(0) => Err(ParlaError::Download(format!("empty body from {}", url))),
        other => other,
    };
    let written = match written {
        Ok(n) => n,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", partial.display(), rm);
                }
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&partial, dest).await?;
    info!("Downloaded {} bytes", written);
    Ok(dest.to_path_buf())
}

/// Stream the response body into `partial`. Returns the bytes written.
async fn write_body(response: reqwest::Response, partial: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ParlaError::Download(format!("stream interrupted: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
