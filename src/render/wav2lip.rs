//! Wav2Lip neural renderer.

use super::{discard_partial, run_tool, verify_output, Renderer};
use crate::config::{BackendKind, Settings};
use crate::error::{ParlaError, Result};
use crate::media::MediaReference;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Runs Wav2Lip inference as an external process.
///
/// Wav2Lip resolves paths against its own checkout, so every path passed
/// to it is made absolute and the process runs inside the checkout.
pub struct Wav2LipRenderer {
    python: String,
    dir: PathBuf,
    checkpoint: PathBuf,
}

impl Wav2LipRenderer {
    pub fn new(python: impl Into<String>, dir: impl Into<PathBuf>, checkpoint: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            dir: dir.into(),
            checkpoint: checkpoint.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.wav2lip.python.clone(),
            settings.wav2lip_dir(),
            settings.wav2lip_checkpoint(),
        )
    }

    /// The checkpoint this renderer requires.
    pub fn checkpoint(&self) -> &Path {
        &self.checkpoint
    }

    /// Checkpoint and inference script are both on disk.
    ///
    /// Cheaper than launching the model and parsing its failure.
    fn check_prerequisites(&self) -> Result<()> {
        if !self.checkpoint.is_file() {
            return Err(self.unavailable(format!(
                "checkpoint not found at {}",
                self.checkpoint.display()
            )));
        }
        if !self.dir.join("inference.py").is_file() {
            return Err(self.unavailable(format!(
                "inference.py not found in {}",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn unavailable(&self, reason: String) -> ParlaError {
        ParlaError::BackendUnavailable {
            backend: self.name().to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Renderer for Wav2LipRenderer {
    fn name(&self) -> &str {
        "wav2lip"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Neural
    }

    #[instrument(skip(self), fields(output = %output.display()))]
    async fn render(
        &self,
        face: &MediaReference,
        audio: &MediaReference,
        output: &Path,
    ) -> Result<PathBuf> {
        let face = face.require_local()?;
        let audio = audio.require_local()?;

        self.check_prerequisites()?;

        let checkpoint = std::path::absolute(&self.checkpoint)?;
        let face_abs = std::path::absolute(face)?;
        let audio_abs = std::path::absolute(audio)?;
        let output_abs = std::path::absolute(output)?;
        let script = std::path::absolute(self.dir.join("inference.py"))?;

        info!("Running Wav2Lip: {} + {}", audio.display(), face.display());
        debug!("Checkpoint: {}", checkpoint.display());

        let mut command = Command::new(&self.python);
        command
            .arg(&script)
            .arg("--checkpoint_path").arg(&checkpoint)
            .arg("--face").arg(&face_abs)
            .arg("--audio").arg(&audio_abs)
            .arg("--outfile").arg(&output_abs)
            .current_dir(&self.dir);

        if let Err(e) = run_tool(self.name(), &mut command).await {
            discard_partial(&output_abs);
            return Err(e);
        }

        // Wav2Lip can exit 0 without writing anything (e.g. no face detected).
        verify_output(self.name(), &output_abs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake Wav2Lip checkout whose inference.py is a shell script run by `sh`.
    fn fake_checkout(dir: &Path, script_body: &str, with_checkpoint: bool) -> Wav2LipRenderer {
        let checkout = dir.join("Wav2Lip");
        std::fs::create_dir_all(checkout.join("checkpoints")).unwrap();
        std::fs::write(checkout.join("inference.py"), script_body).unwrap();

        let checkpoint = checkout.join("checkpoints").join("wav2lip_gan.pth");
        if with_checkpoint {
            std::fs::write(&checkpoint, b"weights").unwrap();
        }

        Wav2LipRenderer::new("sh", checkout, checkpoint)
    }

    const WRITE_OUTFILE: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --outfile) out="$2"; shift ;;
  esac
  shift
done
echo synced > "$out"
"#;

    #[tokio::test]
    async fn test_missing_checkpoint_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("launched");
        let renderer = fake_checkout(
            dir.path(),
            &format!("touch {}", marker.display()),
            false,
        );

        let err = renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &dir.path().join("out.mp4"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ParlaError::BackendUnavailable { .. }));
        assert!(!marker.exists(), "model process must not be launched");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_passes_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let args_log = dir.path().join("args.txt");
        let body = format!("echo \"$@\" > {}\n{}", args_log.display(), WRITE_OUTFILE);
        let renderer = fake_checkout(dir.path(), &body, true);

        let out = dir.path().join("out.mp4");
        let path = renderer
            .render(
                &MediaReference::local("relative/f.jpg"),
                &MediaReference::local("relative/a.wav"),
                &out,
            )
            .await
            .unwrap();

        assert_eq!(path, out);
        let logged = std::fs::read_to_string(&args_log).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert!(logged.contains(&format!("--face {}", cwd.join("relative/f.jpg").display())));
        assert!(logged.contains(&format!("--audio {}", cwd.join("relative/a.wav").display())));
        assert!(logged.contains("--checkpoint_path /"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_zero_without_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_checkout(dir.path(), "exit 0", true);

        let err = renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &dir.path().join("out.mp4"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ParlaError::BackendExecutionFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = fake_checkout(dir.path(), "echo 'Face not detected!' >&2; exit 1", true);

        match renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &dir.path().join("out.mp4"),
            )
            .await
            .unwrap_err()
        {
            ParlaError::BackendExecutionFailed { diagnostic, .. } => {
                assert!(diagnostic.contains("Face not detected!"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
