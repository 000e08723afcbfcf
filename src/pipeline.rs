//! End-to-end pipeline: text capture → speech synthesis → avatar video.

use crate::config::Settings;
use crate::error::{ParlaError, Result};
use crate::media::{validate_destination_name, GenerationRequest, GenerationResult, MediaReference};
use crate::orchestrator::Orchestrator;
use crate::speech::{PiperSynthesizer, Synthesizer, Transcriber, Voice};
use crate::store::ArtifactStore;
use std::sync::Arc;
use tracing::{info, instrument};

/// Output of one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Text that was spoken.
    pub text: Option<String>,
    /// Synthesized or supplied audio.
    pub audio: MediaReference,
    /// Generation result.
    pub result: GenerationResult,
}

/// Chains a transcriber, a synthesizer and the orchestrator.
pub struct AvatarPipeline {
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Arc<dyn Synthesizer>,
    orchestrator: Orchestrator,
    clean_on_start: bool,
}

impl AvatarPipeline {
    /// Build the pipeline from settings, with Piper for synthesis.
    pub fn new(settings: &Settings, transcriber: Option<Arc<dyn Transcriber>>) -> Result<Self> {
        let orchestrator = Orchestrator::new(settings)?;
        let synthesizer = Arc::new(PiperSynthesizer::from_settings(
            &settings.voice,
            orchestrator.store().clone(),
        ));
        Ok(Self::with_components(
            transcriber,
            synthesizer,
            orchestrator,
            settings.general.clean_on_start,
        ))
    }

    /// Build the pipeline from explicit components.
    pub fn with_components(
        transcriber: Option<Arc<dyn Transcriber>>,
        synthesizer: Arc<dyn Synthesizer>,
        orchestrator: Orchestrator,
        clean_on_start: bool,
    ) -> Self {
        Self {
            transcriber,
            synthesizer,
            orchestrator,
            clean_on_start,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &ArtifactStore {
        self.orchestrator.store()
    }

    /// Capture text from the transcriber, then speak it.
    #[instrument(skip(self, face))]
    pub async fn run(&self, voice: Voice, face: &MediaReference, destination: &str) -> Result<PipelineRun> {
        let transcriber = self.transcriber.as_ref().ok_or_else(|| {
            ParlaError::Config("No transcriber configured; pass the text directly".to_string())
        })?;

        let text = transcriber.transcribe().await?;
        info!("Captured text: {}", text);
        self.speak(&text, voice, face, destination).await
    }

    /// Synthesize `text` and animate it onto `face`.
    #[instrument(skip(self, text, face))]
    pub async fn speak(
        &self,
        text: &str,
        voice: Voice,
        face: &MediaReference,
        destination: &str,
    ) -> Result<PipelineRun> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParlaError::InvalidInput("Nothing to say: text is empty".to_string()));
        }
        validate_destination_name(destination)?;

        self.prepare();
        let audio = MediaReference::Local(self.synthesizer.synthesize(text, voice).await?);
        info!("Audio ready at {}", audio);

        let request = GenerationRequest::new(audio.clone(), face.clone(), destination)?;
        let result = self.orchestrator.generate(&request).await;

        Ok(PipelineRun {
            text: Some(text.to_string()),
            audio,
            result,
        })
    }

    /// Animate existing audio onto `face`.
    pub async fn animate(
        &self,
        audio: &MediaReference,
        face: &MediaReference,
        destination: &str,
    ) -> Result<PipelineRun> {
        let request = GenerationRequest::new(audio.clone(), face.clone(), destination)?;
        let result = self.orchestrator.generate(&request).await;
        Ok(PipelineRun {
            text: None,
            audio: audio.clone(),
            result,
        })
    }

    /// Clear stale outputs if configured.
    fn prepare(&self) {
        if self.clean_on_start {
            let removed = self.store().clear_outputs();
            if removed > 0 {
                info!("Removed {} stale artifacts", removed);
            }
        }
    }
}
