//! Local rendering backends.
//!
//! Each backend turns a face reference plus an audio track into one video
//! file. Backends classify their own failures so the orchestrator can
//! decide whether to fall through to the next one:
//!
//! - missing prerequisite (executable, checkpoint) → `BackendUnavailable`
//! - ran but failed or produced nothing → `BackendExecutionFailed`

mod ffmpeg;
mod wav2lip;

pub use ffmpeg::StillImageRenderer;
pub use wav2lip::Wav2LipRenderer;

use crate::config::{BackendKind, Settings};
use crate::error::{ParlaError, Result};
use crate::media::MediaReference;
use crate::store::is_non_empty_file;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use tokio::process::Command;
use tracing::warn;

/// Longest diagnostic kept from a tool's stderr.
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// A backend capable of producing a lip-synced video.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short backend name used in logs and results.
    fn name(&self) -> &str;

    /// Which configured backend this is.
    fn kind(&self) -> BackendKind;

    /// Render `face` speaking `audio` into `output`.
    ///
    /// On success exactly one file exists at the returned path.
    async fn render(
        &self,
        face: &MediaReference,
        audio: &MediaReference,
        output: &Path,
    ) -> Result<PathBuf>;
}

/// Build the renderer chain for a priority list.
pub fn build_renderers(settings: &Settings) -> Vec<Arc<dyn Renderer>> {
    settings
        .generation
        .backends
        .iter()
        .map(|kind| -> Arc<dyn Renderer> {
            match kind {
                BackendKind::Neural => Arc::new(Wav2LipRenderer::from_settings(settings)),
                BackendKind::Local => Arc::new(StillImageRenderer::from_settings(&settings.ffmpeg)),
            }
        })
        .collect()
}

/// Run an external tool to completion, classifying spawn and exit failures.
pub(crate) async fn run_tool(backend: &str, command: &mut Command) -> Result<Output> {
    let result = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ParlaError::BackendUnavailable {
                backend: backend.to_string(),
                reason: format!("executable not found: {}", program_name(command)),
            });
        }
        Err(e) => {
            return Err(ParlaError::BackendExecutionFailed {
                backend: backend.to_string(),
                diagnostic: format!("failed to start {}: {e}", program_name(command)),
            });
        }
    };

    if !output.status.success() {
        return Err(ParlaError::BackendExecutionFailed {
            backend: backend.to_string(),
            diagnostic: format!("{}: {}", output.status, stderr_tail(&output.stderr)),
        });
    }

    Ok(output)
}

/// Confirm the tool left a non-empty file behind; remove any partial file otherwise.
pub(crate) fn verify_output(backend: &str, output: &Path) -> Result<PathBuf> {
    if is_non_empty_file(output) {
        return Ok(output.to_path_buf());
    }

    discard_partial(output);
    Err(ParlaError::BackendExecutionFailed {
        backend: backend.to_string(),
        diagnostic: format!("exited successfully but produced no output at {}", output.display()),
    })
}

/// Remove whatever a failed run left at `output`.
pub(crate) fn discard_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!("Failed to remove partial output {}: {}", output.display(), e);
        }
    }
}

fn program_name(command: &Command) -> String {
    command.as_std().get_program().to_string_lossy().into_owned()
}

/// Last `MAX_DIAGNOSTIC_CHARS` characters of stderr, trimmed.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect();
    format!("...{}", tail)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_truncates_from_front() {
        let long = "x".repeat(MAX_DIAGNOSTIC_CHARS) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.starts_with("..."));
        assert!(tail.ends_with("END"));
        assert_eq!(stderr_tail(b"  short\n"), "short");
    }

    #[test]
    fn test_build_renderers_follows_priority() {
        let mut settings = Settings::default();
        let kinds: Vec<_> = build_renderers(&settings).iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![BackendKind::Neural, BackendKind::Local]);

        settings.generation.backends = vec![BackendKind::Local];
        let kinds: Vec<_> = build_renderers(&settings).iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![BackendKind::Local]);
    }

    #[tokio::test]
    async fn test_run_tool_missing_executable_is_unavailable() {
        let mut cmd = Command::new("parla-definitely-not-installed");
        let err = run_tool("test", &mut cmd).await.unwrap_err();
        assert!(matches!(err, ParlaError::BackendUnavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_nonzero_exit_captures_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo 'codec exploded' >&2; exit 3");
        match run_tool("test", &mut cmd).await.unwrap_err() {
            ParlaError::BackendExecutionFailed { diagnostic, .. } => {
                assert!(diagnostic.contains("codec exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_output_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        std::fs::write(&out, b"").unwrap();

        assert!(verify_output("test", &out).is_err());
        assert!(!out.exists());

        std::fs::write(&out, b"video").unwrap();
        assert_eq!(verify_output("test", &out).unwrap(), out);
    }

    #[test]
    fn test_discard_partial_tolerates_unremovable_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        std::fs::write(&out, b"half").unwrap();
        discard_partial(&out);
        assert!(!out.exists());

        // remove_file fails on a directory; the error is logged, not raised.
        let stuck = dir.path().join("stuck.mp4");
        std::fs::create_dir(&stuck).unwrap();
        discard_partial(&stuck);
        assert!(stuck.is_dir());
    }
}
