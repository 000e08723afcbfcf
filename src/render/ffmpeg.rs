//! Still-image renderer: the face shown for the full length of the audio.
//!
//! Needs nothing but ffmpeg, so it is the availability floor of the
//! local chain and is always tried last.

use super::{discard_partial, run_tool, verify_output, Renderer};
use crate::config::{BackendKind, FfmpegSettings};
use crate::error::Result;
use crate::media::MediaReference;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, instrument};

/// Face references with these extensions are treated as video, not stills.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v", "mpeg", "mpg"];

/// libx264 with yuv420p needs even width and height.
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// ffmpeg-based audio-over-image composition.
pub struct StillImageRenderer {
    binary: String,
    audio_bitrate: String,
}

impl StillImageRenderer {
    /// Create a renderer using `ffmpeg` from PATH.
    pub fn new() -> Self {
        Self::from_settings(&FfmpegSettings::default())
    }

    pub fn from_settings(settings: &FfmpegSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            audio_bitrate: settings.audio_bitrate.clone(),
        }
    }

    /// Argument list for one invocation.
    fn build_args(&self, face: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let still = !is_video(face);
        let mut args = Vec::new();

        push_args(&mut args, &[&"-y", &"-loglevel", &"error"]);
        if still {
            push_args(&mut args, &[&"-loop", &"1"]);
        }
        push_args(&mut args, &[&"-i", &face, &"-i", &audio]);
        push_args(
            &mut args,
            &[
                &"-map", &"0:v:0", &"-map", &"1:a:0",
                &"-vf", &EVEN_DIMENSIONS_FILTER,
                &"-c:v", &"libx264",
            ],
        );
        if still {
            push_args(&mut args, &[&"-tune", &"stillimage"]);
        }
        push_args(
            &mut args,
            &[
                &"-c:a", &"aac",
                &"-b:a", &self.audio_bitrate,
                &"-pix_fmt", &"yuv420p",
                &"-shortest",
                &output,
            ],
        );
        args
    }
}

fn push_args(args: &mut Vec<OsString>, values: &[&dyn AsRef<OsStr>]) {
    args.extend(values.iter().map(|v| v.as_ref().to_os_string()));
}

impl Default for StillImageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl Renderer for StillImageRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
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

        info!("Composing {} over {}", audio.display(), face.display());

        let mut command = Command::new(&self.binary);
        command.args(self.build_args(face, audio, output));

        if let Err(e) = run_tool(self.name(), &mut command).await {
            discard_partial(output);
            return Err(e);
        }

        verify_output(self.name(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParlaError;

    fn args_as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_still_image_args() {
        let renderer = StillImageRenderer::new();
        let args = args_as_strings(renderer.build_args(
            Path::new("face.jpg"),
            Path::new("speech.wav"),
            Path::new("out/out.mp4"),
        ));

        assert_eq!(&args[3..5], ["-loop", "1"]);
        assert!(args.windows(2).any(|w| w == ["-vf", EVEN_DIMENSIONS_FILTER]));
        assert!(args.windows(2).any(|w| w == ["-tune", "stillimage"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().unwrap(), "out/out.mp4");
    }

    #[test]
    fn test_video_face_skips_loop() {
        let renderer = StillImageRenderer::new();
        let args = args_as_strings(renderer.build_args(
            Path::new("media/face.MP4"),
            Path::new("speech.wav"),
            Path::new("out.mp4"),
        ));

        assert!(!args.contains(&"-loop".to_string()));
        assert!(!args.contains(&"stillimage".to_string()));
        assert!(args.windows(2).any(|w| w == ["-vf", EVEN_DIMENSIONS_FILTER]));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = StillImageRenderer::from_settings(&FfmpegSettings {
            binary: dir.path().join("no-ffmpeg").to_string_lossy().into_owned(),
            ..FfmpegSettings::default()
        });

        let err = renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &dir.path().join("out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ParlaError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_remote_reference_rejected() {
        let renderer = StillImageRenderer::new();
        let err = renderer
            .render(
                &MediaReference::parse("https://example.com/f.jpg"),
                &MediaReference::local("a.wav"),
                Path::new("out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ParlaError::InvalidInput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_with_fake_ffmpeg() {
        use crate::render::testing::write_script;

        let dir = tempfile::tempdir().unwrap();
        // Writes its last argument, like ffmpeg writing the output container.
        let fake = write_script(dir.path(), "ffmpeg", r#"for last; do :; done; echo muxed > "$last""#);
        let renderer = StillImageRenderer::from_settings(&FfmpegSettings {
            binary: fake.to_string_lossy().into_owned(),
            ..FfmpegSettings::default()
        });

        let out = dir.path().join("out.mp4");
        let path = renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &out,
            )
            .await
            .unwrap();

        assert_eq!(path, out);
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_partial_output_removed_on_failure() {
        use crate::render::testing::write_script;

        let dir = tempfile::tempdir().unwrap();
        let fake = write_script(
            dir.path(),
            "ffmpeg",
            r#"for last; do :; done; echo partial > "$last"; echo 'Conversion failed!' >&2; exit 1"#,
        );
        let renderer = StillImageRenderer::from_settings(&FfmpegSettings {
            binary: fake.to_string_lossy().into_owned(),
            ..FfmpegSettings::default()
        });

        let out = dir.path().join("out.mp4");
        let err = renderer
            .render(
                &MediaReference::local("f.jpg"),
                &MediaReference::local("a.wav"),
                &out,
            )
            .await
            .unwrap_err();

        match err {
            ParlaError::BackendExecutionFailed { diagnostic, .. } => {
                assert!(diagnostic.contains("Conversion failed!"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.exists());
    }
}
