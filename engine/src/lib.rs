//! Avatalk Engine Library
//!
//! Conversation orchestration for a hosted language model with optional
//! talking-avatar video per reply. Used by the `avatalk` binary and the
//! integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Conversation context store
pub mod context;

/// Text generation backend abstraction
pub mod llm;

/// Avatar video backend and job poller
pub mod video;

/// Progress notifications for in-flight turns
pub mod progress;

/// Turn orchestration
pub mod orchestrator;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
