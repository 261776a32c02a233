//! The three values Avatalk cannot run without.

use sdk::errors::EngineError;

use super::{env_var_name, SecretManager, SecretString, REPLICA_ID, TEXT_API_KEY, VIDEO_API_KEY};
use crate::config::Config;

/// Resolved credentials for both backends
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Language-model API key
    pub text_api_key: SecretString,

    /// Video API key
    pub video_api_key: SecretString,

    /// Avatar persona that renders the video
    pub replica_id: String,
}

impl Credentials {
    /// Resolve credentials through the secret manager.
    ///
    /// The replica id falls back to `[video].replica_id` from the config file.
    ///
    /// # Errors
    /// `EngineError::ConfigurationMissing` naming every value that could not be found.
    pub fn resolve(secrets: &SecretManager, config: &Config) -> Result<Self, EngineError> {
        Self::resolve_with(|key| secrets.lookup(key), config)
    }

    /// Resolve credentials through an arbitrary lookup function.
    pub fn resolve_with<F>(lookup: F, config: &Config) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<SecretString>,
    {
        let text_api_key = lookup(TEXT_API_KEY);
        let video_api_key = lookup(VIDEO_API_KEY);
        let replica_id = lookup(REPLICA_ID)
            .map(|s| s.unsecure().to_string())
            .or_else(|| {
                config
                    .video
                    .replica_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            });

        match (text_api_key, video_api_key, replica_id) {
            (Some(text_api_key), Some(video_api_key), Some(replica_id)) => Ok(Self {
                text_api_key,
                video_api_key,
                replica_id,
            }),
            (text, video, replica) => {
                let mut missing = Vec::new();
                if text.is_none() {
                    missing.push(env_var_name(TEXT_API_KEY));
                }
                if video.is_none() {
                    missing.push(env_var_name(VIDEO_API_KEY));
                }
                if replica.is_none() {
                    missing.push(env_var_name(REPLICA_ID));
                }
                Err(EngineError::ConfigurationMissing(missing.join(", ")))
            }
        }
    }
}
