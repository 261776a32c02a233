//! Avatalk SDK
//!
//! Shared error taxonomy and data model for Avatalk components.
//! The engine and any presentation surface depend on these types.

/// Error types and handling
pub mod errors;

/// Conversation and video job types
pub mod types;

// Re-export commonly used types
pub use errors::{AvatalkErrorExt, EngineError};
pub use types::{
    JobSnapshot, Speaker, Tone, Turn, TurnRequest, TurnResult, VideoJob, VideoOutcome,
    VideoStatus,
};
