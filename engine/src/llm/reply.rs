//! Reply generation on top of a `TextBackend`.

use std::sync::Arc;
use std::time::Instant;

use sdk::errors::EngineError;
use sdk::types::Tone;

use super::{LLMError, Message, MessageRole, TextBackend};

/// Turns an assembled context into a single reply string
pub struct ReplyGenerator {
    backend: Arc<dyn TextBackend>,

    /// Model identifiers a turn may select
    models: Vec<String>,
}

impl ReplyGenerator {
    pub fn new(backend: Arc<dyn TextBackend>, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    /// The configured model set
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Generate a reply for `context` with the given model and tone.
    ///
    /// The tone is framed as a stylistic instruction on the system message.
    /// No retries happen here; failures go straight back to the caller.
    ///
    /// # Errors
    /// - `BackendRejected` for an unknown model, an empty reply, or an
    ///   application-level error from the service
    /// - `BackendUnavailable` when the call could not be completed
    pub async fn generate(
        &self,
        context: &[Message],
        model: &str,
        tone: Tone,
    ) -> Result<String, EngineError> {
        if !self.models.iter().any(|m| m == model) {
            return Err(LLMError::UnknownModel(model.to_string()).into());
        }

        let framed = frame_with_tone(context, tone);
        let start = Instant::now();
        let result = self.backend.complete(&framed, model).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(reply) if !reply.trim().is_empty() => {
                tracing::info!(
                    backend = self.backend.name(),
                    model,
                    latency_ms,
                    reply_chars = reply.len(),
                    "Reply generated"
                );
                Ok(reply.trim().to_string())
            }
            Ok(_) => {
                tracing::warn!(backend = self.backend.name(), model, latency_ms, "Empty reply");
                Err(LLMError::EmptyResponse.into())
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    model,
                    latency_ms,
                    "Reply generation failed: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Models the backend reports that are also in the configured set.
    ///
    /// Falls back to the configured set when the backend call fails or
    /// nothing overlaps.
    pub async fn available_models(&self) -> Vec<String> {
        match self.backend.list_models().await {
            Ok(remote) => {
                let served: Vec<String> = self
                    .models
                    .iter()
                    .filter(|m| remote.contains(m))
                    .cloned()
                    .collect();
                if served.is_empty() {
                    tracing::warn!("Backend serves none of the configured models");
                    self.models.clone()
                } else {
                    served
                }
            }
            Err(e) => {
                tracing::warn!("Failed to list models, using configured set: {}", e);
                self.models.clone()
            }
        }
    }
}

/// Append `Tone: <tone>` to the first system message, or lead with one
fn frame_with_tone(context: &[Message], tone: Tone) -> Vec<Message> {
    let mut framed = context.to_vec();
    let tone_line = format!("Tone: {}", tone);

    match framed.iter_mut().find(|m| m.role == MessageRole::System) {
        Some(system) => {
            system.content = format!("{}\n{}", system.content, tone_line)
                .trim()
                .to_string();
        }
        None => framed.insert(0, Message::system(tone_line)),
    }

    framed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Result as LLMResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: Mutex<Option<LLMResult<String>>>,
        seen: Mutex<Vec<Vec<Message>>>,
        models: Option<Vec<String>>,
    }

    impl ScriptedBackend {
        fn replying(reply: LLMResult<String>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
                models: None,
            }
        }
    }

    #[async_trait]
    impl TextBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, messages: &[Message], _model: &str) -> LLMResult<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LLMError::EmptyResponse))
        }

        async fn list_models(&self) -> LLMResult<Vec<String>> {
            self.models
                .clone()
                .ok_or_else(|| LLMError::NetworkError("offline".to_string()))
        }
    }

    fn catalog() -> Vec<String> {
        vec!["model-a".to_string(), "model-b".to_string()]
    }

    #[tokio::test]
    async fn test_generate_frames_tone_on_system_message() {
        let backend = Arc::new(ScriptedBackend::replying(Ok("  Ahoy!  ".to_string())));
        let generator = ReplyGenerator::new(backend.clone(), catalog());

        let context = vec![Message::system("You are a pirate."), Message::user("Hi")];
        let reply = generator
            .generate(&context, "model-a", Tone::Humorous)
            .await
            .unwrap();

        assert_eq!(reply, "Ahoy!");
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].content, "You are a pirate.\nTone: Humorous");
    }

    #[tokio::test]
    async fn test_generate_adds_tone_system_message() {
        let backend = Arc::new(ScriptedBackend::replying(Ok("Hello".to_string())));
        let generator = ReplyGenerator::new(backend.clone(), catalog());

        generator
            .generate(&[Message::user("Hi")], "model-b", Tone::default())
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0][0], Message::system("Tone: Neutral"));
        assert_eq!(seen[0][1], Message::user("Hi"));
    }

    #[tokio::test]
    async fn test_unknown_model_rejected_without_call() {
        let backend = Arc::new(ScriptedBackend::replying(Ok("unused".to_string())));
        let generator = ReplyGenerator::new(backend.clone(), catalog());

        let err = generator
            .generate(&[Message::user("Hi")], "gpt-9", Tone::Neutral)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::BackendRejected(_)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_reply_is_rejected() {
        let backend = Arc::new(ScriptedBackend::replying(Ok("   ".to_string())));
        let generator = ReplyGenerator::new(backend, catalog());

        let err = generator
            .generate(&[Message::user("Hi")], "model-a", Tone::Neutral)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::BackendRejected(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let backend = Arc::new(ScriptedBackend::replying(Err(LLMError::Timeout)));
        let generator = ReplyGenerator::new(backend, catalog());

        let err = generator
            .generate(&[Message::user("Hi")], "model-a", Tone::Neutral)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_available_models_filters_to_catalog() {
        let backend = Arc::new(ScriptedBackend {
            reply: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
            models: Some(vec!["model-b".to_string(), "whisper-large".to_string()]),
        });
        let generator = ReplyGenerator::new(backend, catalog());

        assert_eq!(generator.available_models().await, vec!["model-b"]);
    }

    #[tokio::test]
    async fn test_available_models_falls_back_on_error() {
        let backend = Arc::new(ScriptedBackend::replying(Ok(String::new())));
        let generator = ReplyGenerator::new(backend, catalog());

        assert_eq!(generator.available_models().await, catalog());
    }
}
