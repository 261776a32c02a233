//! Error types and handling
//!
//! This module provides the error types used throughout Avatalk.
//! All errors implement the `AvatalkErrorExt` trait which provides user-friendly
//! hints and indicates whether the process can carry on with the next turn.
//!
//! # Propagation
//!
//! - Text generation errors abort a turn before anything is committed.
//! - Video errors never abort a turn; they are folded into the turn's
//!   video outcome with a reason attached.
//! - Transient transport errors during polling are absorbed up to a bound.
//!
//! # Security
//!
//! Error messages carry backend text that has already been scrubbed of
//! key-shaped strings. Hints are static and never include backend text.

use thiserror::Error;

/// Trait for Avatalk error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AvatalkErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens)
    /// - Raw backend payloads
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors leave the orchestrator usable for the next turn.
    /// Non-recoverable errors require fixing configuration before retrying.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: missing credentials, malformed config file
/// - **Text backend**: unreachable or rejecting language-model service
/// - **Video backend**: rejected submissions, transport failures
/// - **Polling**: budget exhausted, connection could not be sustained
///
/// # Examples
///
/// ```
/// use sdk::errors::{AvatalkErrorExt, EngineError};
///
/// let error = EngineError::BackendUnavailable("connection refused".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::ConfigurationMissing("TAVUS_API_KEY".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors
    #[error("Message cannot be empty")]
    EmptyMessage,

    // Text backend errors
    #[error("Text backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Text backend rejected the request: {0}")]
    BackendRejected(String),

    // Video backend errors
    #[error("Video submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Video transport error: {0}")]
    TransportError(String),

    // Polling errors
    #[error("Video generation timed out after {waited_secs}s")]
    TimedOut { waited_secs: u64 },

    #[error("Video polling aborted after {failures} consecutive transport failures: {last_error}")]
    PollingAborted { failures: u32, last_error: String },

    #[error("Operation cancelled")]
    Cancelled,

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatalkErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::ConfigurationMissing(_) => {
                "Set GROQ_API_KEY, TAVUS_API_KEY and TAVUS_REPLICA_ID or run 'avatalk setup'"
            }
            Self::Config(_) => "Check your config.toml file for errors",

            // Input errors
            Self::EmptyMessage => "Type a message before sending",

            // Text backend errors
            Self::BackendUnavailable(_) => {
                "Language model service unreachable. Check your network and try again"
            }
            Self::BackendRejected(_) => {
                "Language model service refused the request. Check the model, quota and API key"
            }

            // Video backend errors
            Self::SubmissionRejected(_) => {
                "Video service refused the script. Check the replica id and API key"
            }
            Self::TransportError(_) => "Video service unreachable. Check your connection",

            // Polling errors
            Self::TimedOut { .. } => "Video is taking too long. It may still finish later",
            Self::PollingAborted { .. } => {
                "Lost contact with the video service while waiting. Try again"
            }
            Self::Cancelled => {
                "Turn cancelled before the reply arrived. Nothing was added to the conversation"
            }

            // Keyring errors
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::ConfigurationMissing(_) | Self::Config(_) | Self::KeyringError(_) => false,

            // All other errors leave the conversation usable
            _ => true,
        }
    }
}
