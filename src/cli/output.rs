//! CLI output formatting utilities.

use crate::media::{GenerationResult, Outcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print the outcome of a generation request.
    pub fn generation_result(result: &GenerationResult) {
        match result.outcome {
            Outcome::Success => {
                let artifact = result
                    .artifact
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                Output::success(&format!("Video ready: {}", style(artifact).bold()));
            }
            Outcome::NoSource => Output::error("Missing input: audio or face not found"),
            Outcome::BackendUnavailable => Output::error("No backend available"),
            Outcome::BackendFailed => Output::error("Generation failed"),
        }

        if let Some(backend) = &result.backend {
            Output::kv("Backend", backend);
        }
        if let Some(diagnostic) = &result.diagnostic {
            Output::kv("Details", &truncate(diagnostic, 400));
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate text with ellipsis, on a character boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max_chars {
        text
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line\nbreak", 20), "line break");
        assert_eq!(truncate("ããããã", 3), "ããã...");
    }
}
