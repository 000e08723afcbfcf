//! Configuration settings for Parla.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub generation: GenerationSettings,
    pub ffmpeg: FfmpegSettings,
    pub wav2lip: Wav2LipSettings,
    pub remote: RemoteSettings,
    pub voice: VoiceSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where audio and video artifacts are written.
    pub output_dir: String,
    /// Remove stale artifacts from the output directory before each run.
    pub clean_on_start: bool,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "outputs".to_string(),
            clean_on_start: true,
            log_level: "warn".to_string(),
        }
    }
}

/// Where generation runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Local backends with fallback (Wav2Lip, then ffmpeg).
    #[default]
    Local,
    /// Asynchronous remote lip-sync API.
    Remote,
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(GenerationMode::Local),
            "remote" | "api" => Ok(GenerationMode::Remote),
            _ => Err(format!("Unknown generation mode: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Local => write!(f, "local"),
            GenerationMode::Remote => write!(f, "remote"),
        }
    }
}

/// Identifier of a local rendering backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Wav2Lip neural lip-sync model.
    Neural,
    /// ffmpeg still-image composition.
    Local,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Neural => write!(f, "neural"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Local or remote generation.
    pub mode: GenerationMode,
    /// Local backend priority, highest fidelity first.
    pub backends: Vec<BackendKind>,
    /// Reference face (image or video) used when none is given.
    pub default_face: String,
    /// Overall limit for a remote job, in seconds. None waits indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Local,
            backends: vec![BackendKind::Neural, BackendKind::Local],
            default_face: "media/face.jpg".to_string(),
            timeout_seconds: None,
        }
    }
}

/// ffmpeg settings for the still-image renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegSettings {
    /// ffmpeg executable name or path.
    pub binary: String,
    /// AAC audio bitrate.
    pub audio_bitrate: String,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// Wav2Lip neural renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Wav2LipSettings {
    /// Python interpreter used to run inference.
    pub python: String,
    /// Wav2Lip checkout containing `inference.py`.
    pub dir: String,
    /// Model checkpoint. Defaults to `<dir>/checkpoints/wav2lip_gan.pth`.
    pub checkpoint: Option<String>,
}

impl Default for Wav2LipSettings {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            dir: "extras/Wav2Lip".to_string(),
            checkpoint: None,
        }
    }
}

/// Remote lip-sync API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// API base URL.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model identifier sent with each job.
    pub model: String,
    /// How audio/video length mismatches are resolved (e.g. cutoff, loop).
    pub sync_mode: String,
    /// Fixed delay between status polls.
    pub poll_interval_seconds: u64,
    /// Maximum polls per job. None polls until a terminal status.
    pub max_polls: Option<u32>,
    /// Consecutive transport errors tolerated while polling.
    pub max_transport_errors: u32,
    /// Public URL under which `public_root` is reachable.
    pub public_base_url: Option<String>,
    /// Local directory exposed at `public_base_url`. Defaults to the output dir.
    pub public_root: Option<String>,
    /// Download the finished video into the output directory.
    pub download: bool,
    /// Per-request HTTP timeout.
    pub request_timeout_seconds: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.sync.so".to_string(),
            api_key_env: "SYNCSO".to_string(),
            model: "lipsync-2".to_string(),
            sync_mode: "cutoff".to_string(),
            poll_interval_seconds: 10,
            max_polls: None,
            max_transport_errors: 5,
            public_base_url: None,
            public_root: None,
            download: true,
            request_timeout_seconds: 60,
        }
    }
}

/// Piper speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Piper executable name or path.
    pub piper_binary: String,
    /// Male voice model (.onnx).
    pub male: String,
    /// Female voice model (.onnx).
    pub female: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            piper_binary: "piper".to_string(),
            male: "voices/pt_PT-tuga-medium.onnx".to_string(),
            female: "voices/pt_PT-dii-high.onnx".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ParlaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parla")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded default face path.
    pub fn default_face(&self) -> PathBuf {
        Self::expand_path(&self.generation.default_face)
    }

    /// Get the expanded Wav2Lip checkout directory.
    pub fn wav2lip_dir(&self) -> PathBuf {
        Self::expand_path(&self.wav2lip.dir)
    }

    /// Get the Wav2Lip checkpoint path, explicit or inside the checkout.
    pub fn wav2lip_checkpoint(&self) -> PathBuf {
        match &self.wav2lip.checkpoint {
            Some(p) => Self::expand_path(p),
            None => self.wav2lip_dir().join("checkpoints").join("wav2lip_gan.pth"),
        }
    }

    /// Get the directory exposed over HTTP for remote jobs.
    pub fn public_root(&self) -> PathBuf {
        match &self.remote.public_root {
            Some(p) => Self::expand_path(p),
            None => self.output_dir(),
        }
    }

    /// Read the remote API key from the configured environment variable.
    pub fn remote_api_key(&self) -> Option<String> {
        std::env::var(&self.remote.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
