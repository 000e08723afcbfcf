//! Typed input as a transcriber.

use super::Transcriber;
use crate::error::{ParlaError, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

/// Reads lines until one contains text.
pub struct ConsoleTranscriber<R> {
    lines: Mutex<Lines<R>>,
    prompt: bool,
}

impl ConsoleTranscriber<BufReader<Stdin>> {
    /// Read from stdin, prompting on stderr.
    pub fn stdin() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            prompt: true,
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleTranscriber<R> {
    /// Read from any buffered reader, without prompts.
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            prompt: false,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Transcriber for ConsoleTranscriber<R> {
    async fn transcribe(&self) -> Result<String> {
        let mut lines = self.lines.lock().await;

        if self.prompt {
            eprintln!("Say something (type and press Enter):");
        }

        while let Some(line) = lines.next_line().await? {
            let text = line.trim();
            if !text.is_empty() {
                debug!("Captured {} characters", text.len());
                return Ok(text.to_string());
            }
            if self.prompt {
                eprintln!("Didn't catch that, try again...");
            }
        }

        Err(ParlaError::Transcription(
            "input closed before any text was entered".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skips_blank_lines() {
        let input: &[u8] = b"\n   \nhello there  \nsecond\n";
        let transcriber = ConsoleTranscriber::from_reader(input);

        assert_eq!(transcriber.transcribe().await.unwrap(), "hello there");
        assert_eq!(transcriber.transcribe().await.unwrap(), "second");
        assert!(matches!(
            transcriber.transcribe().await,
            Err(ParlaError::Transcription(_))
        ));
    }
}
