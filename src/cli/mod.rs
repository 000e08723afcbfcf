//! CLI module for Parla.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Parla - Talking Avatar Generation
///
/// A local-first CLI tool that turns speech into a talking-head video.
/// The name "Parla" comes from the Italian and Catalan word for "speaks."
#[derive(Parser, Debug)]
#[command(name = "parla")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PARLA_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Speak text as the avatar (reads from the console when TEXT is omitted)
    Say {
        /// Text to speak
        text: Option<String>,

        /// Voice to use (male or female)
        #[arg(long, default_value = "female")]
        voice: String,

        /// Reference face image or video (local path or URL)
        #[arg(short, long)]
        face: Option<String>,

        /// Output file name inside the output directory
        #[arg(short, long)]
        output: Option<String>,

        /// Generate with the remote lip-sync API instead of local backends
        #[arg(long)]
        remote: bool,

        /// Keep previous outputs instead of clearing them first
        #[arg(long)]
        keep: bool,
    },

    /// Animate an existing audio file
    Animate {
        /// Audio file (local path or URL)
        audio: String,

        /// Reference face image or video (local path or URL)
        #[arg(short, long)]
        face: Option<String>,

        /// Output file name inside the output directory
        #[arg(short, long)]
        output: Option<String>,

        /// Generate with the remote lip-sync API instead of local backends
        #[arg(long)]
        remote: bool,
    },

    /// Remove generated files from the output directory
    Clean,

    /// Check system requirements and configuration
    Doctor,

    /// Serve the output directory over HTTP so a remote backend can fetch inputs
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_say() {
        let cli = Cli::parse_from(["parla", "-vv", "say", "olá", "--voice", "male", "--remote"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Say { text, voice, remote, keep, .. } => {
                assert_eq!(text.as_deref(), Some("olá"));
                assert_eq!(voice, "male");
                assert!(remote);
                assert!(!keep);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::parse_from(["parla", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Init { force: true } }
        ));
    }
}
