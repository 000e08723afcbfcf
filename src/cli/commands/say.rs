//! Say command: text → speech → avatar video.

use super::{destination_name, interruptible, report, resolve_face, with_mode};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::AvatarPipeline;
use crate::speech::{ConsoleTranscriber, Transcriber, Voice};
use anyhow::Result;
use std::sync::Arc;

/// Run the say command.
pub async fn run_say(
    text: Option<&str>,
    voice: &str,
    face: Option<&str>,
    output: Option<&str>,
    remote: bool,
    keep: bool,
    settings: &Settings,
) -> Result<()> {
    let mut settings = with_mode(settings, remote);
    if keep {
        settings.general.clean_on_start = false;
    }

    let voice: Voice = voice.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Say, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'parla doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let transcriber: Option<Arc<dyn Transcriber>> = match text {
        Some(_) => None,
        None => Some(Arc::new(ConsoleTranscriber::stdin())),
    };
    let pipeline = AvatarPipeline::new(&settings, transcriber)?;
    let face = resolve_face(face, &settings);
    let destination = destination_name(output);

    let run = match text {
        Some(text) => {
            let spinner = Output::spinner(&format!("Generating with {} voice...", voice));
            let run = interruptible(pipeline.speak(text, voice, &face, &destination)).await;
            spinner.finish_and_clear();
            run?
        }
        None => interruptible(pipeline.run(voice, &face, &destination)).await?,
    };

    if let Some(text) = &run.text {
        Output::kv("Text", text);
    }
    Output::kv("Audio", &run.audio.to_string());
    report(&run.result)
}
