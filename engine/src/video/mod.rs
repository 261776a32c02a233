//! Avatar Video Layer
//!
//! `VideoBackend` is the request/response seam to the asynchronous video
//! service: submit a script for a replica, then fetch job status by id. The
//! Tavus wire shape lives in `tavus`; `VideoJobPoller` drives a submitted job
//! to a terminal outcome on top of the trait.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::JobSnapshot;

use crate::secrets::SecretManager;

pub mod poller;
pub mod tavus;

pub use poller::{PollOutcome, PollPolicy, VideoJobPoller};
pub use tavus::TavusClient;

/// Result type for video backend operations
pub type Result<T> = std::result::Result<T, VideoError>;

/// Errors raised by a single video backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoError {
    /// The backend refused the input (bad replica, script too long, bad key)
    #[error("{0}")]
    SubmissionRejected(String),

    /// The call could not be completed or the response was unusable
    #[error("{0}")]
    Transport(String),
}

impl From<VideoError> for EngineError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::SubmissionRejected(msg) => {
                EngineError::SubmissionRejected(SecretManager::scrub(&msg))
            }
            VideoError::Transport(msg) => EngineError::TransportError(SecretManager::scrub(&msg)),
        }
    }
}

/// Video backend trait
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "tavus")
    fn name(&self) -> &str;

    /// Submit `script` to be narrated by `replica_id`; returns the job id
    async fn submit(&self, script: &str, replica_id: &str) -> Result<String>;

    /// Fetch the current state of a job.
    ///
    /// An id the backend does not know comes back as a `failed` snapshot,
    /// not as an error.
    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot>;
}
