//! HTTP client for the sync.so lip-sync generation API.

use super::{LipsyncApi, RemoteStatus};
use crate::config::RemoteSettings;
use crate::error::{ParlaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    input: Vec<GenerateInput<'a>>,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateInput<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    sync_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    id: String,
}

/// sync.so API client.
pub struct SyncLabsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    model: String,
    sync_mode: String,
}

impl SyncLabsClient {
    /// Create a client against `base_url` (e.g. `https://api.sync.so`).
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            model: "lipsync-2".to_string(),
            sync_mode: "cutoff".to_string(),
        })
    }

    /// Create a client from settings; the API key comes from the environment.
    pub fn from_settings(settings: &RemoteSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ParlaError::Config(format!(
                    "{} not set. Set it with: export {}='...'",
                    settings.api_key_env, settings.api_key_env
                ))
            })?;

        Ok(Self::new(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.request_timeout_seconds),
        )?
        .with_model(&settings.model)
        .with_sync_mode(&settings.sync_mode))
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: &str) -> Self {
        self.sync_mode = sync_mode.to_string();
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

/// Turn a non-2xx response into an error carrying status and body.
async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ParlaError::Transport(format!("HTTP {}: {}", status, body.trim())))
}

#[async_trait]
impl LipsyncApi for SyncLabsClient {
    #[instrument(skip(self))]
    async fn submit(&self, video: &Url, audio: &Url) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            input: vec![
                GenerateInput { kind: "video", url: video.as_str() },
                GenerateInput { kind: "audio", url: audio.as_str() },
            ],
            options: GenerateOptions { sync_mode: &self.sync_mode },
        };

        let response = self
            .http
            .post(self.endpoint("v2/generate")?)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ParlaError::SubmissionFailed(e.to_string()))?;

        let response = error_for_status(response)
            .await
            .map_err(|e| ParlaError::SubmissionFailed(e.to_string()))?;

        let created: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ParlaError::SubmissionFailed(format!("malformed response: {e}")))?;

        debug!("Created job {}", created.id);
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn poll(&self, job_id: &str) -> Result<RemoteStatus> {
        let response = self
            .http
            .get(self.endpoint(&format!("v2/generate/{}", job_id))?)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ParlaError::Transport(e.to_string()))?;

        let response = error_for_status(response).await?;
        let status = response
            .json::<RemoteStatus>()
            .await
            .map_err(|e| ParlaError::Transport(format!("malformed status: {e}")))?;
        Ok(status)
    }
}
