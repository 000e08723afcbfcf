//! Remote lip-sync generation.
//!
//! A job is submitted to an asynchronous API and polled until it reaches a
//! terminal status:
//!
//! ```text
//! Submitted --submit ok--> Polling --COMPLETED--> Completed
//!                             |  ^
//!                             |  +--anything else (after interval)
//!                             +-----FAILED-------> Failed
//! ```
//!
//! Submission errors are terminal at once. Transport errors while polling
//! are retried after the same interval, up to a consecutive-error bound.

mod download;
mod synclabs;

pub use download::download;
pub use synclabs::SyncLabsClient;

use crate::error::{ParlaError, Result};
use crate::media::MediaReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Lifecycle state of a remote job, as tracked locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Submitted,
    Polling,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A submitted job. Owned by one request; immutable once terminal.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationJob {
    job_id: String,
    state: JobState,
    output_url: Option<String>,
    polls: u32,
    submitted_at: DateTime<Utc>,
}

impl GenerationJob {
    fn new(job_id: String) -> Self {
        Self {
            job_id,
            state: JobState::Submitted,
            output_url: None,
            polls: 0,
            submitted_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn output_url(&self) -> Option<&str> {
        self.output_url.as_deref()
    }

    /// Status requests made so far, including ones that hit transport errors.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    fn finish(&mut self, state: JobState, output_url: Option<String>) {
        self.state = state;
        self.output_url = output_url;
    }
}

/// How a raw remote status string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPhase {
    Completed,
    Failed,
    /// Any other value, known or not.
    Running,
}

/// One status response from the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub status: String,
    #[serde(default, rename = "outputUrl")]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            output_url: None,
            error: None,
        }
    }

    pub fn completed(output_url: impl Into<String>) -> Self {
        Self {
            status: "COMPLETED".to_string(),
            output_url: Some(output_url.into()),
            error: None,
        }
    }

    /// Only COMPLETED and FAILED are terminal; the in-progress vocabulary is open.
    pub fn phase(&self) -> StatusPhase {
        let status = self.status.trim();
        if status.eq_ignore_ascii_case("COMPLETED") {
            StatusPhase::Completed
        } else if status.eq_ignore_ascii_case("FAILED") {
            StatusPhase::Failed
        } else {
            StatusPhase::Running
        }
    }
}

/// Transport to a remote lip-sync service.
#[async_trait]
pub trait LipsyncApi: Send + Sync {
    /// Create a job from a video/image URL and an audio URL. Returns the job id.
    async fn submit(&self, video: &Url, audio: &Url) -> Result<String>;

    /// Fetch the current status of a job. One round trip.
    async fn poll(&self, job_id: &str) -> Result<RemoteStatus>;
}

/// Polling policy for [`RemoteJobClient`].
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Fixed delay before every poll.
    pub interval: Duration,
    /// Maximum polls per job, never fewer than one. None polls until a
    /// terminal status.
    pub max_polls: Option<u32>,
    /// Consecutive transport errors tolerated before giving up.
    pub max_transport_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: None,
            max_transport_errors: 5,
        }
    }
}

/// Drives one remote job from submission to a terminal state.
pub struct RemoteJobClient {
    api: Arc<dyn LipsyncApi>,
    policy: PollPolicy,
}

impl RemoteJobClient {
    pub fn new(api: Arc<dyn LipsyncApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit a job. Both references must already be URLs.
    #[instrument(skip_all, fields(video = %video, audio = %audio))]
    pub async fn submit(
        &self,
        video: &MediaReference,
        audio: &MediaReference,
    ) -> Result<GenerationJob> {
        let (video_url, audio_url) = match (video.as_remote(), audio.as_remote()) {
            (Some(v), Some(a)) => (v, a),
            _ => {
                return Err(ParlaError::InvalidInput(
                    "Remote generation needs URL-addressed media; expose local files first"
                        .to_string(),
                ))
            }
        };

        let job_id = self
            .api
            .submit(video_url, audio_url)
            .await
            .map_err(|e| match e {
                ParlaError::SubmissionFailed(_) => e,
                other => ParlaError::SubmissionFailed(other.to_string()),
            })?;

        info!("Submitted remote job {}", job_id);
        Ok(GenerationJob::new(job_id))
    }

    /// Poll a job once.
    pub async fn poll(&self, job_id: &str) -> Result<RemoteStatus> {
        self.api.poll(job_id).await
    }

    /// Poll until the job is terminal. Returns the output URL on completion.
    ///
    /// Sleeps before every poll, so at least one interval passes before the
    /// first status check. Dropping the future cancels the wait at the next
    /// sleep or request boundary; the remote job itself is not cancelled.
    #[instrument(skip_all, fields(job_id = %job.job_id))]
    pub async fn await_completion(&self, job: &mut GenerationJob) -> Result<String> {
        if job.state.is_terminal() {
            return match (job.state, &job.output_url) {
                (JobState::Completed, Some(url)) => Ok(url.clone()),
                _ => Err(ParlaError::RemoteGenerationFailed {
                    job_id: job.job_id.clone(),
                    reason: "job already failed".to_string(),
                }),
            };
        }

        job.state = JobState::Polling;
        let mut transport_errors = 0u32;

        loop {
            if let Some(max) = self.policy.max_polls {
                if job.polls >= max.max(1) {
                    job.finish(JobState::Failed, None);
                    return Err(ParlaError::PollingExhausted {
                        job_id: job.job_id.clone(),
                        attempts: job.polls,
                    });
                }
            }

            tokio::time::sleep(self.policy.interval).await;
            job.polls += 1;

            let status = match self.api.poll(&job.job_id).await {
                Ok(status) => {
                    transport_errors = 0;
                    status
                }
                Err(e) => {
                    transport_errors += 1;
                    warn!(
                        "Poll {} failed ({}/{} consecutive): {}",
                        job.polls, transport_errors, self.policy.max_transport_errors, e
                    );
                    if transport_errors >= self.policy.max_transport_errors {
                        job.finish(JobState::Failed, None);
                        return Err(ParlaError::Transport(format!(
                            "job {}: {} consecutive poll errors, last: {}",
                            job.job_id, transport_errors, e
                        )));
                    }
                    continue;
                }
            };

            debug!("Poll {}: status {}", job.polls, status.status);

            match status.phase() {
                StatusPhase::Running => continue,
                StatusPhase::Completed => {
                    return match status.output_url.filter(|u| !u.trim().is_empty()) {
                        Some(url) => {
                            info!("Remote job completed after {} polls", job.polls);
                            job.finish(JobState::Completed, Some(url.clone()));
                            Ok(url)
                        }
                        None => {
                            job.finish(JobState::Failed, None);
                            Err(ParlaError::RemoteGenerationFailed {
                                job_id: job.job_id.clone(),
                                reason: "completed without an output URL".to_string(),
                            })
                        }
                    };
                }
                StatusPhase::Failed => {
                    job.finish(JobState::Failed, None);
                    return Err(ParlaError::RemoteGenerationFailed {
                        job_id: job.job_id.clone(),
                        reason: status
                            .error
                            .unwrap_or_else(|| "remote job reported FAILED".to_string()),
                    });
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{fast_policy, ScriptedApi};
    use super::*;

    fn url_refs() -> (MediaReference, MediaReference) {
        (
            MediaReference::parse("https://host.example/face.mp4"),
            MediaReference::parse("https://host.example/speech.wav"),
        )
    }

    #[test]
    fn test_status_phase_is_open_ended() {
        assert_eq!(RemoteStatus::new("COMPLETED").phase(), StatusPhase::Completed);
        assert_eq!(RemoteStatus::new("FAILED").phase(), StatusPhase::Failed);
        assert_eq!(RemoteStatus::new("completed").phase(), StatusPhase::Completed);
        for running in ["PENDING", "PROCESSING", "SUBMITTED", "QUEUED", "SOMETHING_NEW", ""] {
            assert_eq!(RemoteStatus::new(running).phase(), StatusPhase::Running);
        }
    }

    #[test]
    fn test_status_deserializes_camel_case_url() {
        let status: RemoteStatus = serde_json::from_str(
            r#"{"id":"J1","status":"COMPLETED","outputUrl":"https://cdn/x.mp4"}"#,
        )
        .unwrap();
        assert_eq!(status.output_url.as_deref(), Some("https://cdn/x.mp4"));
    }

    #[tokio::test]
    async fn test_submitted_then_completed() {
        let api = Arc::new(ScriptedApi::new(
            "J1",
            vec![
                Ok(RemoteStatus::new("SUBMITTED")),
                Ok(RemoteStatus::completed("https://cdn.example/J1.mp4")),
            ],
        ));
        let client = RemoteJobClient::new(api.clone(), fast_policy());
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        assert_eq!(job.state(), JobState::Submitted);
        assert_eq!(job.job_id(), "J1");

        let url = client.await_completion(&mut job).await.unwrap();
        assert_eq!(url, "https://cdn.example/J1.mp4");
        assert_eq!(api.poll_count(), 2);
        assert_eq!(job.polls(), 2);
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.output_url(), Some("https://cdn.example/J1.mp4"));
    }

    #[tokio::test]
    async fn test_failed_after_three_polls() {
        let api = Arc::new(ScriptedApi::new(
            "J1",
            vec![
                Ok(RemoteStatus::new("PROCESSING")),
                Ok(RemoteStatus::new("PROCESSING")),
                Ok(RemoteStatus::new("FAILED")),
            ],
        ));
        let client = RemoteJobClient::new(api.clone(), fast_policy());
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let err = client.await_completion(&mut job).await.unwrap_err();

        assert!(matches!(err, ParlaError::RemoteGenerationFailed { .. }));
        assert_eq!(api.poll_count(), 3);
        assert_eq!(job.state(), JobState::Failed);
        assert!(job.output_url().is_none());
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let api = Arc::new(ScriptedApi::new(
            "J2",
            vec![
                Err(ParlaError::Transport("connection reset".into())),
                Err(ParlaError::Transport("connection reset".into())),
                Ok(RemoteStatus::new("PROCESSING")),
                Err(ParlaError::Transport("timeout".into())),
                Ok(RemoteStatus::completed("https://cdn.example/J2.mp4")),
            ],
        ));
        let client = RemoteJobClient::new(api.clone(), fast_policy());
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let url = client.await_completion(&mut job).await.unwrap();

        assert_eq!(url, "https://cdn.example/J2.mp4");
        assert_eq!(api.poll_count(), 5);
    }

    #[tokio::test]
    async fn test_consecutive_transport_errors_are_bounded() {
        let api = Arc::new(ScriptedApi::new(
            "J3",
            (0..10)
                .map(|_| Err(ParlaError::Transport("unreachable".into())))
                .collect(),
        ));
        let client = RemoteJobClient::new(api.clone(), fast_policy());
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let err = client.await_completion(&mut job).await.unwrap_err();

        assert!(matches!(err, ParlaError::Transport(_)));
        assert_eq!(api.poll_count(), 3);
        assert_eq!(job.state(), JobState::Failed);
    }

    #[tokio::test]
    async fn test_max_polls_bound() {
        let api = Arc::new(ScriptedApi::new("J4", Vec::new()));
        let policy = PollPolicy {
            max_polls: Some(4),
            ..fast_policy()
        };
        let client = RemoteJobClient::new(api.clone(), policy);
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let err = client.await_completion(&mut job).await.unwrap_err();

        assert!(matches!(err, ParlaError::PollingExhausted { attempts: 4, .. }));
        assert_eq!(api.poll_count(), 4);
    }

    #[tokio::test]
    async fn test_zero_max_polls_still_polls_once() {
        let api = Arc::new(ScriptedApi::new(
            "J1",
            vec![Ok(RemoteStatus::completed("https://cdn.example/J1.mp4"))],
        ));
        let policy = PollPolicy {
            max_polls: Some(0),
            ..fast_policy()
        };
        let client = RemoteJobClient::new(api.clone(), policy);
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let url = client.await_completion(&mut job).await.unwrap();

        assert_eq!(url, "https://cdn.example/J1.mp4");
        assert_eq!(api.poll_count(), 1);
        assert_eq!(job.state(), JobState::Completed);
    }

    #[tokio::test]
    async fn test_completed_without_url_is_failure() {
        let api = Arc::new(ScriptedApi::new("J5", vec![Ok(RemoteStatus::new("COMPLETED"))]));
        let client = RemoteJobClient::new(api, fast_policy());
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let err = client.await_completion(&mut job).await.unwrap_err();
        assert!(matches!(err, ParlaError::RemoteGenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_submit_requires_urls() {
        let api = Arc::new(ScriptedApi::new("J6", Vec::new()));
        let client = RemoteJobClient::new(api.clone(), fast_policy());

        let err = client
            .submit(
                &MediaReference::local("face.mp4"),
                &MediaReference::parse("https://host.example/a.wav"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ParlaError::InvalidInput(_)));
        assert_eq!(api.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_error_is_terminal() {
        let api = Arc::new(ScriptedApi::failing_submit("503 Service Unavailable"));
        let client = RemoteJobClient::new(api.clone(), fast_policy());
        let (video, audio) = url_refs();

        let err = client.submit(&video, &audio).await.unwrap_err();
        assert!(matches!(err, ParlaError::SubmissionFailed(_)));
        assert_eq!(api.submit_count(), 1);
        assert_eq!(api.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_can_be_cancelled_by_timeout() {
        let api = Arc::new(ScriptedApi::new("J7", Vec::new()));
        let policy = PollPolicy {
            interval: Duration::from_millis(20),
            ..fast_policy()
        };
        let client = RemoteJobClient::new(api.clone(), policy);
        let (video, audio) = url_refs();

        let mut job = client.submit(&video, &audio).await.unwrap();
        let waited = tokio::time::timeout(
            Duration::from_millis(70),
            client.await_completion(&mut job),
        )
        .await;

        assert!(waited.is_err());
        assert!(!job.state().is_terminal());
    }
}
