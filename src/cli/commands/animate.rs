//! Animate command: existing audio → avatar video.

use super::{destination_name, interruptible, report, resolve_face, with_mode};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::media::MediaReference;
use crate::pipeline::AvatarPipeline;
use anyhow::Result;

/// Run the animate command.
pub async fn run_animate(
    audio: &str,
    face: Option<&str>,
    output: Option<&str>,
    remote: bool,
    settings: &Settings,
) -> Result<()> {
    let settings = with_mode(settings, remote);

    if let Err(e) = preflight::check(Operation::Animate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'parla doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = AvatarPipeline::new(&settings, None)?;
    let audio = MediaReference::parse(audio);
    let face = resolve_face(face, &settings);
    let destination = destination_name(output);

    Output::info(&format!(
        "Animating {} ({} mode: {})",
        audio,
        pipeline.orchestrator().mode(),
        pipeline.orchestrator().backend_names().join(" → ")
    ));

    let spinner = Output::spinner("Generating video...");
    let run = interruptible(pipeline.animate(&audio, &face, &destination)).await;
    spinner.finish_and_clear();

    report(&run?.result)
}
