//! Configuration management
//!
//! This module handles loading, validation, and management of the Avatalk configuration.
//! Configuration is stored in TOML format at ~/.avatalk/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **chat**: model catalog, default model and tone, optional system context
//! - **text_backend**: language-model service endpoint and request timeout
//! - **video**: avatar video service endpoint, request timeout and polling policy
//!
//! Secrets (API keys, replica id) are not stored here; see [`crate::secrets`].
//! The replica id may optionally be pinned in `[video]` since it is not sensitive.
//!
//! # Examples
//!
//! ```no_run
//! use avatalk_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default model: {}", config.chat.default_model);
//! println!("Poll interval: {:?}", config.video.poll_interval());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::Tone;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Conversation defaults
    #[serde(default)]
    pub chat: ChatConfig,

    /// Language-model service settings
    #[serde(default)]
    pub text_backend: TextBackendConfig,

    /// Avatar video service settings
    #[serde(default)]
    pub video: VideoConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// The fixed set of model identifiers a turn may select
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Model used when a turn does not name one; must be in `models`
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Tone used when a turn does not name one
    #[serde(default = "default_tone")]
    pub default_tone: String,

    /// System instruction applied when a turn does not provide one
    #[serde(default)]
    pub system_context: Option<String>,

    /// Whether turns request an avatar video unless told otherwise
    #[serde(default = "default_true")]
    pub generate_video: bool,
}

/// Text-generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBackendConfig {
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_text_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_text_timeout")]
    pub request_timeout_secs: u64,
    // Note: API key resolved through secrets, not stored in config
}

/// Video-generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Base URL of the video API
    #[serde(default = "default_video_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_video_timeout")]
    pub request_timeout_secs: u64,

    /// Seconds between status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Overall wait budget in seconds
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Consecutive transport failures tolerated before polling is aborted
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Avatar persona, used when TAVUS_REPLICA_ID is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_id: Option<String>,
}

impl VideoConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TextBackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ChatConfig {
    /// Parsed default tone; validation guarantees this succeeds after loading
    pub fn tone(&self) -> Tone {
        self.default_tone.parse().unwrap_or_default()
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_models() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".to_string(),
        "llama-3.1-8b-instant".to_string(),
        "gemma2-9b-it".to_string(),
        "mixtral-8x7b-32768".to_string(),
    ]
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_tone() -> String {
    Tone::default().to_string()
}

fn default_text_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_text_timeout() -> u64 {
    60
}

fn default_video_base_url() -> String {
    "https://tavusapi.com".to_string()
}

fn default_video_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    10
}

fn default_max_wait() -> u64 {
    20 * 60
}

fn default_max_consecutive_failures() -> u32 {
    3
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            default_model: default_model(),
            default_tone: default_tone(),
            system_context: None,
            generate_video: true,
        }
    }
}

impl Default for TextBackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_text_base_url(),
            request_timeout_secs: default_text_timeout(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: default_video_base_url(),
            request_timeout_secs: default_video_timeout(),
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            max_consecutive_failures: default_max_consecutive_failures(),
            replica_id: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.avatalk/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        Self::load_or_create_at(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there first if absent
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.avatalk/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".avatalk").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if:
    /// - The log level is unknown
    /// - The model list is empty or the default model is not in it
    /// - The default tone is unknown
    /// - The polling interval is zero or longer than the wait budget
    /// - A base URL is empty
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.chat.models.is_empty() {
            return Err(EngineError::Config(
                "chat.models must list at least one model".to_string(),
            ));
        }
        if !self.chat.models.contains(&self.chat.default_model) {
            return Err(EngineError::Config(format!(
                "Default model '{}' is not in chat.models ({})",
                self.chat.default_model,
                self.chat.models.join(", ")
            )));
        }

        self.chat
            .default_tone
            .parse::<Tone>()
            .map_err(EngineError::Config)?;

        if self.text_backend.base_url.trim().is_empty() {
            return Err(EngineError::Config(
                "text_backend.base_url must not be empty".to_string(),
            ));
        }
        if self.video.base_url.trim().is_empty() {
            return Err(EngineError::Config(
                "video.base_url must not be empty".to_string(),
            ));
        }

        if self.video.poll_interval_secs == 0 {
            return Err(EngineError::Config(
                "video.poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.video.poll_interval_secs > self.video.max_wait_secs {
            return Err(EngineError::Config(format!(
                "video.poll_interval_secs ({}) must not exceed video.max_wait_secs ({})",
                self.video.poll_interval_secs, self.video.max_wait_secs
            )));
        }

        Ok(())
    }
}
