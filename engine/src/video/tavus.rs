//! Tavus Video Backend
//!
//! - Submit: `POST {base}/v2/videos` with `{replica_id, script}`; an accepted
//!   job comes back as `{"video_id": ..., "status": "queued"}`.
//! - Status: `GET {base}/v2/videos/{id}` returning `status`, `download_url`
//!   (or `hosted_url`) and `status_details`.
//!
//! Both calls authenticate with an `x-api-key` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sdk::types::JobSnapshot;
use serde::Deserialize;
use serde_json::json;

use super::{Result, VideoBackend, VideoError};
use crate::config::VideoConfig;
use crate::secrets::SecretString;

/// Tavus REST client
#[derive(Debug, Clone)]
pub struct TavusClient {
    base_url: String,
    api_key: SecretString,
    client: Client,
}

impl TavusClient {
    /// Create a client from the `[video]` config section
    pub fn new(config: &VideoConfig, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| VideoError::Transport(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn transport(e: reqwest::Error) -> VideoError {
        if e.is_timeout() {
            VideoError::Transport("request to video service timed out".to_string())
        } else if e.is_connect() {
            VideoError::Transport(format!("cannot connect to video service: {}", e))
        } else {
            VideoError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl VideoBackend for TavusClient {
    fn name(&self) -> &str {
        "tavus"
    }

    async fn submit(&self, script: &str, replica_id: &str) -> Result<String> {
        let script = script.trim();
        if script.is_empty() {
            return Err(VideoError::SubmissionRejected("script is empty".to_string()));
        }

        let url = format!("{}/v2/videos", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.unsecure())
            .json(&json!({
                "replica_id": replica_id,
                "script": script,
            }))
            .send()
            .await
            .map_err(Self::transport)?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VideoError::Transport(format!(
                "video service returned {}",
                status
            )));
        }

        // A non-JSON body is still a rejection; the HTTP reason explains it.
        let body: SubmitResponse = response.json().await.unwrap_or_default();

        match (status.is_success(), body.status.as_deref(), body.video_id) {
            (true, Some("queued"), Some(video_id)) if !video_id.is_empty() => {
                tracing::info!(backend = "tavus", job_id = %video_id, "Video job submitted");
                Ok(video_id)
            }
            (_, job_status, _) => {
                let reason = body
                    .error
                    .or(body.message)
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| match job_status {
                        Some(s) if status.is_success() => {
                            format!("unexpected job status '{}'", s)
                        }
                        _ => status
                            .canonical_reason()
                            .map(str::to_string)
                            .unwrap_or_else(|| status.to_string()),
                    });
                tracing::warn!(
                    backend = "tavus",
                    http_status = %status,
                    "Video submission rejected: {}",
                    reason
                );
                Err(VideoError::SubmissionRejected(reason))
            }
        }
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let url = format!("{}/v2/videos/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.unsecure())
            .send()
            .await
            .map_err(Self::transport)?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Ok(JobSnapshot::failed(format!(
                    "video job {} not found",
                    job_id
                )));
            }
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                return Err(VideoError::Transport(format!(
                    "video service returned {}",
                    s
                )));
            }
            s if !s.is_success() => {
                let reason = s.canonical_reason().unwrap_or("request refused");
                return Ok(JobSnapshot::failed(format!(
                    "status request rejected: {}",
                    reason
                )));
            }
            _ => {}
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| VideoError::Transport(format!("malformed status response: {}", e)))?;

        Ok(body.into_snapshot())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    hosted_url: Option<String>,
    #[serde(default)]
    status_details: Option<String>,
}

impl StatusResponse {
    fn into_snapshot(self) -> JobSnapshot {
        let details = self.status_details.filter(|d| !d.trim().is_empty());

        match self.status.as_str() {
            "queued" => JobSnapshot::queued(),
            "generating" => JobSnapshot::generating(),
            "ready" => match self
                .download_url
                .or(self.hosted_url)
                .filter(|u| !u.is_empty())
            {
                Some(url) => JobSnapshot::ready(url),
                None => JobSnapshot::failed("video ready without a download URL"),
            },
            "error" | "deleted" => {
                JobSnapshot::failed(details.unwrap_or_else(|| format!("video {}", self.status)))
            }
            other => {
                tracing::debug!(backend = "tavus", status = other, "Unrecognized video status");
                JobSnapshot::generating()
            }
        }
    }
}
