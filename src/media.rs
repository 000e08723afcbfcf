//! Core data model: media references, generation requests and results.

use crate::error::{ParlaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Pointer to audio or video content, addressed either locally or by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "location")]
pub enum MediaReference {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// A dereferenceable http(s) URL.
    Remote(Url),
}

impl MediaReference {
    /// Parse user input: http(s) URLs become `Remote`, everything else is a path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            if let Ok(url) = Url::parse(trimmed) {
                return MediaReference::Remote(url);
            }
        }
        MediaReference::Local(PathBuf::from(trimmed))
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        MediaReference::Local(path.into())
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            MediaReference::Local(p) => Some(p),
            MediaReference::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&Url> {
        match self {
            MediaReference::Local(_) => None,
            MediaReference::Remote(u) => Some(u),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MediaReference::Local(_))
    }

    /// Require a local path, for backends that read files directly.
    pub fn require_local(&self) -> Result<&Path> {
        self.as_local().ok_or_else(|| {
            ParlaError::InvalidInput(format!("Expected a local file, got URL {}", self))
        })
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaReference::Local(p) => write!(f, "{}", p.display()),
            MediaReference::Remote(u) => write!(f, "{}", u),
        }
    }
}

/// Reject destination names that could escape the output directory.
///
/// A valid name is exactly one normal path component: no separators,
/// no `.`/`..`, not absolute, not empty.
pub fn validate_destination_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(ParlaError::InvalidInput(format!(
            "Destination name must be a plain file name: {:?}",
            name
        ))),
    }
}

/// One pipeline run's input. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    audio: MediaReference,
    face: MediaReference,
    destination_name: String,
}

impl GenerationRequest {
    /// Build a request, validating the destination file name.
    pub fn new(
        audio: MediaReference,
        face: MediaReference,
        destination_name: impl Into<String>,
    ) -> Result<Self> {
        let destination_name = destination_name.into();
        validate_destination_name(&destination_name)?;
        Ok(Self {
            audio,
            face,
            destination_name,
        })
    }

    pub fn audio(&self) -> &MediaReference {
        &self.audio
    }

    pub fn face(&self) -> &MediaReference {
        &self.face
    }

    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }
}

/// Terminal classification of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    NoSource,
    BackendUnavailable,
    BackendFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::NoSource => write!(f, "no source"),
            Outcome::BackendUnavailable => write!(f, "backend unavailable"),
            Outcome::BackendFailed => write!(f, "backend failed"),
        }
    }
}

/// The single result of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub outcome: Outcome,
    /// Produced artifact, set only on success.
    pub artifact: Option<MediaReference>,
    /// Backend that produced the artifact or the last failure.
    pub backend: Option<String>,
    /// Diagnostic text from the last failure.
    pub diagnostic: Option<String>,
}

impl GenerationResult {
    pub fn success(artifact: MediaReference, backend: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            artifact: Some(artifact),
            backend: Some(backend.into()),
            diagnostic: None,
        }
    }

    /// Build a failure result from a classified backend error.
    pub fn failure(backend: Option<String>, error: &ParlaError) -> Self {
        let outcome = match error.outcome() {
            Outcome::Success => Outcome::BackendFailed,
            other => other,
        };
        Self {
            outcome,
            artifact: None,
            backend,
            diagnostic: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_reference() {
        assert_eq!(
            MediaReference::parse("media/face.jpg"),
            MediaReference::Local(PathBuf::from("media/face.jpg"))
        );
        let remote = MediaReference::parse("https://cdn.example.com/a.wav");
        assert!(remote.as_remote().is_some());
        assert!(!remote.is_local());
        assert!(remote.require_local().is_err());
    }

    #[test]
    fn test_destination_validation() {
        assert!(validate_destination_name("out.mp4").is_ok());
        assert!(validate_destination_name("").is_err());
        assert!(validate_destination_name("..").is_err());
        assert!(validate_destination_name("../out.mp4").is_err());
        assert!(validate_destination_name("sub/out.mp4").is_err());
        assert!(validate_destination_name("/etc/passwd").is_err());
        assert!(validate_destination_name("a\\b.mp4").is_err());
    }

    #[test]
    fn test_request_rejects_traversal() {
        let req = GenerationRequest::new(
            MediaReference::local("a.wav"),
            MediaReference::local("f.jpg"),
            "../../escape.mp4",
        );
        assert!(matches!(req, Err(ParlaError::InvalidInput(_))));
    }

    #[test]
    fn test_failure_result_keeps_diagnostic() {
        let err = ParlaError::BackendExecutionFailed {
            backend: "ffmpeg".into(),
            diagnostic: "bad codec".into(),
        };
        let result = GenerationResult::failure(Some("ffmpeg".into()), &err);
        assert_eq!(result.outcome, Outcome::BackendFailed);
        assert!(result.artifact.is_none());
        assert!(result.diagnostic.unwrap().contains("bad codec"));
    }
}
