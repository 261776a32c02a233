//! Groq Text Backend
//!
//! Implements `TextBackend` against Groq's OpenAI-compatible REST API:
//! `POST {base}/chat/completions` for replies and `GET {base}/models` for the
//! catalog. Authentication is a bearer token.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{LLMError, Message, Result, TextBackend};
use crate::config::TextBackendConfig;
use crate::secrets::SecretString;

/// Groq chat-completions client
#[derive(Debug, Clone)]
pub struct GroqProvider {
    /// Base URL including the version prefix (e.g., "https://api.groq.com/openai/v1")
    base_url: String,

    /// Bearer token
    api_key: SecretString,

    /// HTTP client with the configured request timeout
    client: Client,
}

impl GroqProvider {
    /// Create a new Groq provider from the `[text_backend]` config section
    pub fn new(config: &TextBackendConfig, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LLMError::ProviderUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> LLMError {
        if e.is_timeout() {
            LLMError::Timeout
        } else if e.is_connect() {
            LLMError::ProviderUnavailable(format!("Cannot connect to {}", self.base_url))
        } else {
            LLMError::NetworkError(e.to_string())
        }
    }

    /// Map a non-success response to an error, preferring the service's own message
    async fn map_status_error(response: reqwest::Response, model: Option<&str>) -> LLMError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error)
            .unwrap_or_default();
        let message = detail
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{} {}", status.as_u16(), body.trim()));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                LLMError::AuthenticationFailed(message)
            }
            StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimitExceeded,
            StatusCode::NOT_FOUND if detail.code.as_deref() == Some("model_not_found") => {
                LLMError::UnknownModel(model.unwrap_or_default().to_string())
            }
            s if s.is_server_error() => LLMError::ProviderUnavailable(message),
            _ => LLMError::InvalidRequest(message),
        }
    }
}

#[async_trait]
impl TextBackend for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        let request = ChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
        };

        tracing::debug!(
            "Groq request: model={}, messages={}, total_chars={}",
            model,
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.unsecure())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::map_status_error(response, Some(model)).await);
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.unsecure())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::map_status_error(response, None).await);
        }

        let data: ModelList = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        Ok(data.data.into_iter().map(|m| m.id).collect())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}
