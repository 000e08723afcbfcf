//! Parla CLI entry point.

use anyhow::Result;
use clap::Parser;
use parla::cli::{commands, Cli, Commands};
use parla::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in a local .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("parla={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match &cli.command {
        Commands::Say { text, voice, face, output, remote, keep } => {
            commands::run_say(
                text.as_deref(),
                voice,
                face.as_deref(),
                output.as_deref(),
                *remote,
                *keep,
                &settings,
            )
            .await?;
        }

        Commands::Animate { audio, face, output, remote } => {
            commands::run_animate(audio, face.as_deref(), output.as_deref(), *remote, &settings).await?;
        }

        Commands::Clean => {
            commands::run_clean(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
