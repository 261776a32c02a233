//! Text Generation Layer
//!
//! This module provides the interface to the language-model service. The
//! `TextBackend` trait is the adapter seam: the wire shape of a concrete
//! service (Groq's OpenAI-compatible API in `groq`) stays behind it, and
//! `ReplyGenerator` builds turns on top of it without knowing field names.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::secrets::SecretManager;

pub mod groq;
pub mod reply;

pub use reply::ReplyGenerator;

/// Result type for text backend operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while talking to the text backend
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No response from the model")]
    EmptyResponse,
}

impl LLMError {
    /// Whether the call never completed (as opposed to being refused)
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LLMError::ProviderUnavailable(_) | LLMError::NetworkError(_) | LLMError::Timeout
        )
    }
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        let message = SecretManager::scrub(&err.to_string());
        if err.is_unavailable() {
            EngineError::BackendUnavailable(message)
        } else {
            EngineError::BackendRejected(message)
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Text backend trait that every language-model adapter implements
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "groq")
    fn name(&self) -> &str;

    /// Produce a completion for the given conversation
    ///
    /// # Arguments
    /// * `messages` - Ordered context: system message first, then turns
    /// * `model` - Model identifier understood by the backend
    ///
    /// # Returns
    /// * `Ok(String)` - The reply text (may be empty; callers decide)
    /// * `Err(LLMError)` - If the request fails
    async fn complete(&self, messages: &[Message], model: &str) -> Result<String>;

    /// List model identifiers the backend currently serves
    async fn list_models(&self) -> Result<Vec<String>>;
}
