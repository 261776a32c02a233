//! Conversation and video job types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produced a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Assistant => write!(f, "assistant"),
        }
    }
}

/// One side of an exchange in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Stylistic tone applied to replies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Tone {
    Friendly,
    Formal,
    Casual,
    #[default]
    Neutral,
    Professional,
    Empathetic,
    Humorous,
    Angry,
    Romantic,
}

impl Tone {
    /// Every tone, in menu order
    pub const ALL: [Tone; 9] = [
        Tone::Friendly,
        Tone::Formal,
        Tone::Casual,
        Tone::Neutral,
        Tone::Professional,
        Tone::Empathetic,
        Tone::Humorous,
        Tone::Angry,
        Tone::Romantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "Friendly",
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
            Tone::Neutral => "Neutral",
            Tone::Professional => "Professional",
            Tone::Empathetic => "Empathetic",
            Tone::Humorous => "Humorous",
            Tone::Angry => "Angry",
            Tone::Romantic => "Romantic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    /// Case-insensitive parse of a tone label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Tone::ALL
            .iter()
            .copied()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| {
                let names: Vec<&str> = Tone::ALL.iter().map(Tone::as_str).collect();
                format!("Unknown tone '{}'. Must be one of: {}", needle, names.join(", "))
            })
    }
}

/// Status of a remote video job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Queued,
    Generating,
    Ready,
    Failed,
}

impl VideoStatus {
    /// `ready` and `failed` end polling
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoStatus::Queued => write!(f, "queued"),
            VideoStatus::Generating => write!(f, "generating"),
            VideoStatus::Ready => write!(f, "ready"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One status report fetched from the video backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSnapshot {
    pub status: VideoStatus,

    /// Where the finished video can be fetched from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    /// Backend-provided failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    pub fn queued() -> Self {
        Self {
            status: VideoStatus::Queued,
            locator: None,
            error: None,
        }
    }

    pub fn generating() -> Self {
        Self {
            status: VideoStatus::Generating,
            locator: None,
            error: None,
        }
    }

    pub fn ready(locator: impl Into<String>) -> Self {
        Self {
            status: VideoStatus::Ready,
            locator: Some(locator.into()),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: VideoStatus::Failed,
            locator: None,
            error: Some(reason.into()),
        }
    }
}

/// A submitted video job as tracked during one turn
///
/// Created on successful submission, updated only from polling responses,
/// and dropped once the terminal result has been consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoJob {
    /// Identifier assigned by the video backend
    pub id: String,

    /// Text the avatar narrates
    pub script: String,

    pub status: VideoStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoJob {
    /// A freshly accepted job; the backend reports new jobs as queued
    pub fn submitted(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
            status: VideoStatus::Queued,
            locator: None,
            error: None,
        }
    }

    /// Fold a polled snapshot into the job
    pub fn apply(&mut self, snapshot: JobSnapshot) {
        self.status = snapshot.status;
        if snapshot.locator.is_some() {
            self.locator = snapshot.locator;
        }
        if snapshot.error.is_some() {
            self.error = snapshot.error;
        }
    }
}

/// What happened to the avatar video for a turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VideoOutcome {
    /// No video was requested
    Absent,

    /// Video finished and can be played
    Ready { job_id: String, locator: String },

    /// Submission was refused or the job failed on the backend
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        reason: String,
    },

    /// The wait budget ran out; the backend may still finish the job
    TimedOut { job_id: String, waited_secs: u64 },

    /// Too many consecutive transport failures while polling
    PollingAborted { job_id: String, reason: String },

    /// The caller stopped the video phase; no job id if submission never finished
    Cancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
}

impl VideoOutcome {
    pub fn locator(&self) -> Option<&str> {
        match self {
            VideoOutcome::Ready { locator, .. } => Some(locator),
            _ => None,
        }
    }

    /// Human-readable reason for anything other than `Absent` or `Ready`
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            VideoOutcome::Absent | VideoOutcome::Ready { .. } => None,
            VideoOutcome::Failed { reason, .. } => Some(reason.clone()),
            VideoOutcome::TimedOut { waited_secs, .. } => Some(format!(
                "Video generation timed out after {}s",
                waited_secs
            )),
            VideoOutcome::PollingAborted { reason, .. } => Some(reason.clone()),
            VideoOutcome::Cancelled { .. } => Some("Video cancelled".to_string()),
        }
    }
}

/// Input for one orchestrated turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub user_text: String,

    #[serde(default)]
    pub system_instruction: Option<String>,

    pub model: String,

    #[serde(default)]
    pub tone: Tone,

    #[serde(default)]
    pub want_video: bool,
}

impl TurnRequest {
    pub fn new(user_text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            system_instruction: None,
            model: model.into(),
            tone: Tone::default(),
            want_video: false,
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_video(mut self, want_video: bool) -> Self {
        self.want_video = want_video;
        self
    }
}

/// Result of one successfully answered turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnResult {
    pub turn_id: String,

    /// Assistant reply; always non-empty
    pub reply: String,

    pub video: VideoOutcome,
}
