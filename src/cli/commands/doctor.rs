//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{GenerationMode, Settings};
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Parla Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // External tools
    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        check_tool("ffmpeg", &settings.ffmpeg.binary, "-version", install_hint_ffmpeg()),
        check_tool("piper", &settings.voice.piper_binary, "--help", install_hint_piper()),
        check_tool(
            "python",
            &settings.wav2lip.python,
            "--version",
            "Install Python 3 and the Wav2Lip requirements",
        ),
    ];
    print_section(&mut checks, tool_checks);

    // Models
    println!("{}", style("Models").bold());
    print_section(&mut checks, check_models(settings));

    // API keys
    println!("{}", style("Remote API").bold());
    print_section(&mut checks, vec![check_api_key(settings)]);

    // Directories
    println!("{}", style("Directories").bold());
    print_section(&mut checks, check_directories(settings));

    // Configuration
    println!("{}", style("Configuration").bold());
    print_section(&mut checks, vec![check_config_file()]);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Parla.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Parla is ready to use.");
    }

    Ok(())
}

fn print_section(all: &mut Vec<CheckResult>, section: Vec<CheckResult>) {
    for check in &section {
        check.print();
    }
    println!();
    all.extend(section);
}

/// Check if an external tool is available.
fn check_tool(name: &str, binary: &str, version_arg: &str, hint: &str) -> CheckResult {
    match Command::new(binary).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let version: String = stdout
                .lines()
                .chain(stderr.lines())
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect();

            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::warning(name, "installed but returned an error", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, &format!("{} not found", binary), hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check the Wav2Lip checkout and the Piper voice models.
fn check_models(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let checkpoint = settings.wav2lip_checkpoint();
    results.push(match std::fs::metadata(&checkpoint) {
        Ok(m) if m.is_file() => CheckResult::ok(
            "Wav2Lip checkpoint",
            &format!("{} ({})", checkpoint.display(), format_size(m.len())),
        ),
        _ => CheckResult::warning(
            "Wav2Lip checkpoint",
            &format!("{} not found", checkpoint.display()),
            "Neural rendering will be skipped; the ffmpeg fallback still works",
        ),
    });

    let inference = settings.wav2lip_dir().join("inference.py");
    if !inference.is_file() {
        results.push(CheckResult::warning(
            "Wav2Lip checkout",
            &format!("{} not found", inference.display()),
            "Clone https://github.com/Rudrabha/Wav2Lip into wav2lip.dir",
        ));
    }

    for (voice, path) in [("male", &settings.voice.male), ("female", &settings.voice.female)] {
        let model = Settings::expand_path(path);
        let name = format!("Voice ({})", voice);
        if model.is_file() {
            results.push(CheckResult::ok(&name, &model.display().to_string()));
        } else {
            results.push(CheckResult::error(
                &name,
                &format!("{} not found", model.display()),
                "Download the .onnx model and its .onnx.json from the Piper voices repository",
            ));
        }
    }

    results
}

/// Check if the remote API key is configured.
fn check_api_key(settings: &Settings) -> CheckResult {
    let var = settings.remote.api_key_env.as_str();
    match settings.remote_api_key() {
        Some(key) => CheckResult::ok(var, &format!("configured ({})", mask_key(&key))),
        None if settings.generation.mode == GenerationMode::Remote => CheckResult::error(
            var,
            "not set",
            &format!("Set with: export {}='...' (or add it to .env)", var),
        ),
        None => CheckResult::warning(
            var,
            "not set",
            "Only needed for --remote generation",
        ),
    }
}

/// Mask all but the edges of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check output directory and default face.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let output_dir = settings.output_dir();
    if output_dir.exists() {
        results.push(CheckResult::ok(
            "Output directory",
            &format!("{}", output_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Output directory",
            &format!("{} (will be created)", output_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let face = settings.default_face();
    if face.is_file() {
        results.push(CheckResult::ok("Default face", &format!("{}", face.display())));
    } else {
        results.push(CheckResult::warning(
            "Default face",
            &format!("{} not found", face.display()),
            "Pass --face or set generation.default_face",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: parla config init",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Install hint for piper.
fn install_hint_piper() -> &'static str {
    "Install from: https://github.com/rhasspy/piper/releases"
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
