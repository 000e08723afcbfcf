//! Exposing local media under a public URL for remote backends.
//!
//! Remote generation needs both inputs reachable over HTTP. A `MediaHost`
//! maps files under a local root to a public base URL (served by
//! `parla serve` or any static file server).

use crate::error::{ParlaError, Result};
use crate::media::MediaReference;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// A local directory reachable at a public base URL.
#[derive(Debug, Clone)]
pub struct MediaHost {
    root: PathBuf,
    base_url: Url,
}

impl MediaHost {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ParlaError::Config(format!(
                "public_base_url cannot be used as a base: {}",
                base_url
            )));
        }
        Ok(Self {
            root: root.into(),
            base_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a URL reference for `media`.
    ///
    /// URLs pass through. Files under the root map directly; files elsewhere
    /// are copied into the root first.
    pub fn expose(&self, media: &MediaReference) -> Result<MediaReference> {
        let path = match media {
            MediaReference::Remote(_) => return Ok(media.clone()),
            MediaReference::Local(path) => path,
        };

        let root = std::path::absolute(&self.root)?;
        let absolute = std::path::absolute(path)?;

        let relative = match absolute.strip_prefix(&root) {
            Ok(rel) if is_plain_relative(rel) => rel.to_path_buf(),
            _ => {
                let copied = self.copy_into_root(&absolute, &root)?;
                info!("Copied {} into public root", path.display());
                copied
            }
        };

        let url = self.url_for(&relative)?;
        debug!("Exposed {} as {}", path.display(), url);
        Ok(MediaReference::Remote(url))
    }

    fn copy_into_root(&self, source: &Path, root: &Path) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media");
        let name = format!("{}-{}", Uuid::new_v4().simple(), file_name);

        std::fs::create_dir_all(root)?;
        std::fs::copy(source, root.join(&name))?;
        Ok(PathBuf::from(name))
    }

    fn url_for(&self, relative: &Path) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ParlaError::Config(format!("Invalid public base URL: {}", self.base_url))
            })?;
            segments.pop_if_empty();
            for component in relative.components() {
                if let Component::Normal(part) = component {
                    segments.push(&part.to_string_lossy());
                }
            }
        }
        Ok(url)
    }
}

/// Only normal components, so the path cannot climb out of the root.
fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}
