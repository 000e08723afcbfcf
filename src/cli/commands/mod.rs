//! CLI command implementations.

mod animate;
mod clean;
mod config;
mod doctor;
mod say;
mod serve;

pub use animate::run_animate;
pub use clean::run_clean;
pub use config::run_config;
pub use doctor::run_doctor;
pub use say::run_say;
pub use serve::run_serve;

use crate::cli::Output;
use crate::config::{GenerationMode, Settings};
use crate::media::{GenerationResult, MediaReference};
use anyhow::Result;
use std::future::Future;
use uuid::Uuid;

/// Apply per-invocation overrides to a copy of the settings.
fn with_mode(settings: &Settings, remote: bool) -> Settings {
    let mut settings = settings.clone();
    if remote {
        settings.generation.mode = GenerationMode::Remote;
    }
    settings
}

/// Face argument, or the configured default.
fn resolve_face(face: Option<&str>, settings: &Settings) -> MediaReference {
    match face {
        Some(f) => MediaReference::parse(f),
        None => MediaReference::local(settings.default_face()),
    }
}

/// Output name argument, or a fresh unique one.
fn destination_name(output: Option<&str>) -> String {
    match output {
        Some(name) => name.to_string(),
        None => format!("avatar-{}.mp4", Uuid::new_v4().simple()),
    }
}

/// Run `work`, aborting cleanly on Ctrl+C.
async fn interruptible<T>(work: impl Future<Output = crate::Result<T>>) -> Result<T> {
    tokio::select! {
        result = work => Ok(result?),
        _ = tokio::signal::ctrl_c() => {
            Output::warning("Interrupted.");
            Err(anyhow::anyhow!("interrupted"))
        }
    }
}

/// Print a generation result and turn failures into an error exit.
fn report(result: &GenerationResult) -> Result<()> {
    Output::generation_result(result);
    if result.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("generation ended with outcome: {}", result.outcome))
    }
}
