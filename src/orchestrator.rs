//! Generation orchestrator for Parla.
//!
//! Turns one audio track plus a reference face into one video, choosing a
//! backend and interpreting its outcome. Local mode walks an ordered chain
//! of renderers and falls through on any failure; remote mode submits a
//! job and waits for it, with no local fallback.

use crate::config::{GenerationMode, Settings};
use crate::error::{ParlaError, Result};
use crate::host::MediaHost;
use crate::media::{GenerationRequest, GenerationResult, MediaReference};
use crate::remote::{download, PollPolicy, RemoteJobClient, SyncLabsClient};
use crate::render::{build_renderers, Renderer};
use crate::store::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Backend name reported for remote results.
const REMOTE_BACKEND: &str = "remote";

/// Everything remote mode needs.
pub struct RemoteGeneration {
    client: RemoteJobClient,
    host: Option<MediaHost>,
    download: bool,
    download_timeout: Duration,
    timeout: Option<Duration>,
}

impl RemoteGeneration {
    pub fn new(client: RemoteJobClient) -> Self {
        Self {
            client,
            host: None,
            download: false,
            download_timeout: Duration::from_secs(300),
            timeout: None,
        }
    }

    /// Expose local inputs through `host` before submission.
    pub fn with_host(mut self, host: MediaHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Fetch finished videos into the artifact store (best effort).
    pub fn with_download(mut self, download: bool, timeout: Duration) -> Self {
        self.download = download;
        self.download_timeout = timeout;
        self
    }

    /// Give up on a job after `timeout` in total.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from settings using the sync.so client.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api = Arc::new(SyncLabsClient::from_settings(&settings.remote)?);
        let policy = PollPolicy {
            interval: Duration::from_secs(settings.remote.poll_interval_seconds),
            max_polls: settings.remote.max_polls.map(|n| n.max(1)),
            max_transport_errors: settings.remote.max_transport_errors.max(1),
        };

        let host = settings
            .remote
            .public_base_url
            .as_deref()
            .map(|base| MediaHost::new(settings.public_root(), base))
            .transpose()?;

        let mut remote = Self::new(RemoteJobClient::new(api, policy))
            .with_download(
                settings.remote.download,
                Duration::from_secs(settings.remote.request_timeout_seconds.max(300)),
            )
            .with_timeout(settings.generation.timeout_seconds.map(Duration::from_secs));
        if let Some(host) = host {
            remote = remote.with_host(host);
        }
        Ok(remote)
    }

    /// Turn an input into a URL reference.
    fn expose(&self, media: &MediaReference) -> Result<MediaReference> {
        match (media, &self.host) {
            (MediaReference::Remote(_), _) => Ok(media.clone()),
            (MediaReference::Local(_), Some(host)) => host.expose(media),
            (MediaReference::Local(path), None) => Err(ParlaError::BackendUnavailable {
                backend: REMOTE_BACKEND.to_string(),
                reason: format!(
                    "{} is local and no remote.public_base_url is configured",
                    path.display()
                ),
            }),
        }
    }
}

/// The generation orchestrator.
pub struct Orchestrator {
    mode: GenerationMode,
    store: ArtifactStore,
    renderers: Vec<Arc<dyn Renderer>>,
    remote: Option<RemoteGeneration>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = ArtifactStore::new(settings.output_dir());
        match settings.generation.mode {
            GenerationMode::Local => Ok(Self::local(store, build_renderers(settings))),
            GenerationMode::Remote => {
                Ok(Self::remote(store, RemoteGeneration::from_settings(settings)?))
            }
        }
    }

    /// Local mode with an explicit renderer chain, highest priority first.
    pub fn local(store: ArtifactStore, renderers: Vec<Arc<dyn Renderer>>) -> Self {
        Self {
            mode: GenerationMode::Local,
            store,
            renderers,
            remote: None,
        }
    }

    /// Remote mode.
    pub fn remote(store: ArtifactStore, remote: RemoteGeneration) -> Self {
        Self {
            mode: GenerationMode::Remote,
            store,
            renderers: Vec::new(),
            remote: Some(remote),
        }
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Names of the local renderers, in the order they are tried.
    pub fn backend_names(&self) -> Vec<&str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    /// Produce a video for `request`. Never fails; every failure is classified.
    #[instrument(skip_all, fields(mode = %self.mode, destination = request.destination_name()))]
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        if !ArtifactStore::inputs_exist(request.audio(), request.face()) {
            warn!("Input missing: audio {} / face {}", request.audio(), request.face());
            let missing = ParlaError::InputMissing(format!(
                "audio {} or face {}",
                request.audio(),
                request.face()
            ));
            return GenerationResult::failure(None, &missing);
        }

        match self.mode {
            GenerationMode::Local => self.generate_local(request).await,
            GenerationMode::Remote => self.generate_remote(request).await,
        }
    }

    async fn generate_local(&self, request: &GenerationRequest) -> GenerationResult {
        let output = match self
            .store
            .ensure_root()
            .and_then(|_| self.store.resolve_output_path(request.destination_name()))
        {
            Ok(path) => path,
            Err(e) => return GenerationResult::failure(None, &e),
        };

        let mut last_failure = None;

        for renderer in &self.renderers {
            info!("Trying backend {}", renderer.name());
            match renderer.render(request.face(), request.audio(), &output).await {
                Ok(path) => {
                    info!("Backend {} produced {}", renderer.name(), path.display());
                    return GenerationResult::success(MediaReference::Local(path), renderer.name());
                }
                Err(e) => {
                    warn!("Backend {} did not produce a video ({}): {}", renderer.name(), e.outcome(), e);
                    last_failure = Some((renderer.name().to_string(), e));
                }
            }
        }

        match last_failure {
            Some((backend, error)) => GenerationResult::failure(Some(backend), &error),
            None => GenerationResult::failure(
                None,
                &ParlaError::BackendUnavailable {
                    backend: "local".to_string(),
                    reason: "no local backends configured".to_string(),
                },
            ),
        }
    }

    async fn generate_remote(&self, request: &GenerationRequest) -> GenerationResult {
        let remote = match &self.remote {
            Some(r) => r,
            None => {
                return GenerationResult::failure(
                    Some(REMOTE_BACKEND.to_string()),
                    &ParlaError::BackendUnavailable {
                        backend: REMOTE_BACKEND.to_string(),
                        reason: "remote generation is not configured".to_string(),
                    },
                )
            }
        };

        match self.run_remote(remote, request).await {
            Ok(artifact) => GenerationResult::success(artifact, REMOTE_BACKEND),
            Err(e) => {
                warn!("Remote generation failed: {}", e);
                GenerationResult::failure(Some(REMOTE_BACKEND.to_string()), &e)
            }
        }
    }

    async fn run_remote(
        &self,
        remote: &RemoteGeneration,
        request: &GenerationRequest,
    ) -> Result<MediaReference> {
        let video = remote.expose(request.face())?;
        let audio = remote.expose(request.audio())?;

        // Never retried: every submit is a new job on the remote side.
        let mut job = remote.client.submit(&video, &audio).await?;
        let job_id = job.job_id().to_string();

        let waited = match remote.timeout {
            Some(limit) => tokio::time::timeout(limit, remote.client.await_completion(&mut job))
                .await
                .unwrap_or_else(|_| {
                    Err(ParlaError::RemoteGenerationFailed {
                        job_id: job_id.clone(),
                        reason: format!("no terminal status within {}s", limit.as_secs()),
                    })
                }),
            None => remote.client.await_completion(&mut job).await,
        };
        let output_url = waited?;

        let url = Url::parse(&output_url).map_err(|e| ParlaError::RemoteGenerationFailed {
            job_id: job_id.clone(),
            reason: format!("invalid output URL {:?}: {}", output_url, e),
        })?;

        if !remote.download {
            return Ok(MediaReference::Remote(url));
        }

        Ok(self.materialize(remote, url, request.destination_name()).await)
    }

    /// Best-effort download; the remote URL is kept if it fails.
    async fn materialize(&self, remote: &RemoteGeneration, url: Url, name: &str) -> MediaReference {
        let dest = match self
            .store
            .ensure_root()
            .and_then(|_| self.store.resolve_output_path(name))
        {
            Ok(dest) => dest,
            Err(e) => {
                warn!("Keeping remote result, cannot place download: {}", e);
                return MediaReference::Remote(url);
            }
        };

        match download(url.as_str(), &dest, remote.download_timeout).await {
            Ok(path) => MediaReference::Local(path),
            Err(e) => {
                warn!("Keeping remote result, download failed: {}", e);
                MediaReference::Remote(url)
            }
        }
    }
}
