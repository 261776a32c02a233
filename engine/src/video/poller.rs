//! Video job poller
//!
//! Drives a submitted job to a terminal outcome:
//!
//! ```text
//! Submitted -> {Queued, Generating} -> {Ready, Failed, TimedOut, PollingAborted, Cancelled}
//! ```
//!
//! The first status fetch happens immediately after submission, then one
//! fetch per interval until the job is `ready` or `failed`, or until the wait
//! budget is used up. A failed fetch is a transient miss; more than
//! `max_consecutive_failures` misses in a row abort polling. The cancellation
//! token is checked at every suspension point.

use std::sync::Arc;
use std::time::Duration;

use sdk::errors::EngineError;
use sdk::types::{VideoJob, VideoOutcome, VideoStatus};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{VideoBackend, VideoError};
use crate::config::VideoConfig;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::secrets::SecretManager;

/// Timing policy for one poll run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between status fetches
    pub interval: Duration,

    /// Overall budget measured from the first fetch
    pub max_wait: Duration,

    /// Consecutive transport failures tolerated before aborting
    pub max_consecutive_failures: u32,
}

impl PollPolicy {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_wait: config.max_wait(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

/// Terminal result of polling one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { locator: String },
    Failed { reason: String },
    TimedOut { waited: Duration },
    PollingAborted { failures: u32, last_error: String },
    Cancelled,
}

impl PollOutcome {
    /// Attach the job id for the caller-facing outcome
    pub fn into_video_outcome(self, job_id: &str) -> VideoOutcome {
        let job_id = job_id.to_string();
        match self {
            PollOutcome::Ready { locator } => VideoOutcome::Ready { job_id, locator },
            PollOutcome::Failed { reason } => VideoOutcome::Failed {
                job_id: Some(job_id),
                reason,
            },
            PollOutcome::TimedOut { waited } => VideoOutcome::TimedOut {
                job_id,
                waited_secs: waited.as_secs(),
            },
            PollOutcome::PollingAborted {
                failures,
                last_error,
            } => VideoOutcome::PollingAborted {
                job_id,
                reason: EngineError::PollingAborted {
                    failures,
                    last_error,
                }
                .to_string(),
            },
            PollOutcome::Cancelled => VideoOutcome::Cancelled {
                job_id: Some(job_id),
            },
        }
    }
}

/// Polls a video backend until a job reaches a terminal outcome
pub struct VideoJobPoller {
    backend: Arc<dyn VideoBackend>,
    policy: PollPolicy,
    progress: ProgressBus,
}

impl VideoJobPoller {
    pub fn new(backend: Arc<dyn VideoBackend>, policy: PollPolicy, progress: ProgressBus) -> Self {
        Self {
            backend,
            policy,
            progress,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `job` to a terminal outcome, folding every snapshot into it.
    pub async fn run(&self, job: &mut VideoJob, cancel: &CancellationToken) -> PollOutcome {
        let start = Instant::now();
        let mut fetches: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        while start.elapsed() < self.policy.max_wait {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(job, fetches),
                result = self.backend.fetch_status(&job.id) => result,
            };
            fetches += 1;

            match fetched {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    job.apply(snapshot);
                    tracing::debug!(
                        job_id = %job.id,
                        status = %job.status,
                        fetches,
                        "Polled video job"
                    );

                    match job.status {
                        VideoStatus::Ready => {
                            if let Some(locator) = job.locator.clone() {
                                tracing::info!(
                                    job_id = %job.id,
                                    fetches,
                                    elapsed_secs = start.elapsed().as_secs(),
                                    "Video ready"
                                );
                                return PollOutcome::Ready { locator };
                            }
                            return PollOutcome::Failed {
                                reason: "video ready without a download URL".to_string(),
                            };
                        }
                        VideoStatus::Failed => {
                            let reason = job
                                .error
                                .clone()
                                .unwrap_or_else(|| "video generation failed".to_string());
                            let reason = SecretManager::scrub(&reason);
                            tracing::warn!(job_id = %job.id, fetches, "Video failed: {}", reason);
                            return PollOutcome::Failed { reason };
                        }
                        status @ (VideoStatus::Queued | VideoStatus::Generating) => {
                            self.progress.publish(ProgressEvent::VideoProgress {
                                job_id: job.id.clone(),
                                status,
                                elapsed_secs: start.elapsed().as_secs(),
                                fetches,
                            });
                        }
                    }
                }
                Err(VideoError::Transport(e)) | Err(VideoError::SubmissionRejected(e)) => {
                    consecutive_failures += 1;
                    let e = SecretManager::scrub(&e);
                    if consecutive_failures > self.policy.max_consecutive_failures {
                        tracing::warn!(
                            job_id = %job.id,
                            failures = consecutive_failures,
                            "Video polling aborted: {}",
                            e
                        );
                        return PollOutcome::PollingAborted {
                            failures: consecutive_failures,
                            last_error: e,
                        };
                    }
                    tracing::warn!(
                        job_id = %job.id,
                        failures = consecutive_failures,
                        "Transient status fetch failure: {}",
                        e
                    );
                    self.progress.publish(ProgressEvent::VideoTransientMiss {
                        job_id: job.id.clone(),
                        consecutive_failures,
                        error: e,
                    });
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(job, fetches),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        let waited = start.elapsed();
        tracing::warn!(
            job_id = %job.id,
            fetches,
            waited_secs = waited.as_secs(),
            "Video wait budget exhausted"
        );
        PollOutcome::TimedOut { waited }
    }

    fn cancelled(&self, job: &VideoJob, fetches: u32) -> PollOutcome {
        tracing::info!(job_id = %job.id, fetches, "Video polling cancelled");
        PollOutcome::Cancelled
    }
}
