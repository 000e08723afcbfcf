//! Piper text-to-speech.

use super::{Synthesizer, Voice};
use crate::config::VoiceSettings;
use crate::error::{ParlaError, Result};
use crate::render::discard_partial;
use crate::store::{is_non_empty_file, ArtifactStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Runs the `piper` CLI, feeding text on stdin.
pub struct PiperSynthesizer {
    binary: String,
    male: PathBuf,
    female: PathBuf,
    store: ArtifactStore,
}

impl PiperSynthesizer {
    pub fn new(binary: impl Into<String>, male: PathBuf, female: PathBuf, store: ArtifactStore) -> Self {
        Self {
            binary: binary.into(),
            male,
            female,
            store,
        }
    }

    pub fn from_settings(settings: &VoiceSettings, store: ArtifactStore) -> Self {
        Self::new(
            settings.piper_binary.clone(),
            crate::config::Settings::expand_path(&settings.male),
            crate::config::Settings::expand_path(&settings.female),
            store,
        )
    }

    /// Voice model for a selector.
    pub fn model_for(&self, voice: Voice) -> &Path {
        match voice {
            Voice::Male => &self.male,
            Voice::Female => &self.female,
        }
    }
}

#[async_trait]
impl Synthesizer for PiperSynthesizer {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<PathBuf> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParlaError::InvalidInput("Nothing to say: text is empty".to_string()));
        }

        let model = self.model_for(voice);
        if !model.is_file() {
            return Err(ParlaError::Synthesis(format!(
                "{} voice model not found at {}",
                voice,
                model.display()
            )));
        }

        self.store.ensure_root()?;
        let output = self
            .store
            .resolve_output_path(&format!("speech-{}.wav", Uuid::new_v4().simple()))?;

        info!("Synthesizing with {} voice", voice);

        let mut child = match Command::new(&self.binary)
            .arg("--model").arg(model)
            .arg("--output_file").arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ParlaError::ToolNotFound(self.binary.clone()));
            }
            Err(e) => return Err(ParlaError::Synthesis(format!("failed to start piper: {e}"))),
        };

        // Piper may exit before reading its input; the exit status decides.
        let fed = match child.stdin.take() {
            Some(mut stdin) => feed(&mut stdin, text).await,
            None => Ok(()),
        };

        let result = child.wait_with_output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ParlaError::Synthesis(format!(
                "piper failed ({}): {}",
                result.status,
                stderr.trim()
            )));
        }
        fed?;

        if !is_non_empty_file(&output) {
            discard_partial(&output);
            return Err(ParlaError::Synthesis("Empty audio file generated".to_string()));
        }

        Ok(output)
    }
}

/// Write `text` to piper's stdin, closing it afterwards.
async fn feed(stdin: &mut ChildStdin, text: &str) -> Result<()> {
    let written = async {
        stdin.write_all(text.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.shutdown().await
    }
    .await;

    match written {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("piper closed stdin early");
            Ok(())
        }
        other => Ok(other?),
    }
}
