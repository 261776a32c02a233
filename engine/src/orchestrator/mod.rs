//! Conversation Orchestrator
//!
//! Coordinates one user turn end to end:
//!
//! 1. Refuse to run unless the text backend, video backend and replica id are
//!    all present (`ConfigurationMissing`)
//! 2. Assemble context from the stored history and the request's settings,
//!    then generate the reply; any failure aborts the turn before the store
//!    is touched
//! 3. Commit the exchange and the turn's settings to the context store
//! 4. Optionally submit the reply for an avatar video and poll it to a
//!    terminal outcome; video failures never discard the text reply
//!
//! Turns are serialized by `&mut self`. Progress for the caller is published
//! on the `ProgressBus` while the video is being polled.

use std::sync::Arc;
use std::time::Instant;

use sdk::errors::EngineError;
use sdk::types::{TurnRequest, TurnResult, VideoJob, VideoOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::context::ContextStore;
use crate::llm::groq::GroqProvider;
use crate::llm::{ReplyGenerator, TextBackend};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::secrets::{env_var_name, Credentials, REPLICA_ID, TEXT_API_KEY, VIDEO_API_KEY};
use crate::video::{PollPolicy, TavusClient, VideoBackend, VideoJobPoller};

/// Top-level coordinator for a single conversation
pub struct ConversationOrchestrator {
    context: ContextStore,
    models: Vec<String>,
    policy: PollPolicy,
    generator: Option<ReplyGenerator>,
    video: Option<Arc<dyn VideoBackend>>,
    poller: Option<VideoJobPoller>,
    replica_id: Option<String>,
    progress: ProgressBus,
}

impl ConversationOrchestrator {
    /// Create an orchestrator with no backends attached.
    ///
    /// Every turn fails with `ConfigurationMissing` until the text backend,
    /// video backend and replica id have been supplied.
    pub fn new(config: &Config) -> Self {
        Self {
            context: ContextStore::new(),
            models: config.chat.models.clone(),
            policy: PollPolicy::from_config(&config.video),
            generator: None,
            video: None,
            poller: None,
            replica_id: None,
            progress: ProgressBus::new(),
        }
    }

    /// Wire up the Groq and Tavus clients from resolved credentials
    pub fn from_credentials(config: &Config, credentials: &Credentials) -> Result<Self, EngineError> {
        let text = GroqProvider::new(&config.text_backend, credentials.text_api_key.clone())?;
        let video = TavusClient::new(&config.video, credentials.video_api_key.clone())?;

        Ok(Self::new(config)
            .with_text_backend(Arc::new(text))
            .with_video_backend(Arc::new(video))
            .with_replica_id(credentials.replica_id.clone()))
    }

    pub fn with_text_backend(mut self, backend: Arc<dyn TextBackend>) -> Self {
        self.generator = Some(ReplyGenerator::new(backend, self.models.clone()));
        self
    }

    pub fn with_video_backend(mut self, backend: Arc<dyn VideoBackend>) -> Self {
        self.poller = Some(VideoJobPoller::new(
            Arc::clone(&backend),
            self.policy,
            self.progress.clone(),
        ));
        self.video = Some(backend);
        self
    }

    pub fn with_replica_id(mut self, replica_id: impl Into<String>) -> Self {
        let replica_id = replica_id.into();
        self.replica_id = Some(replica_id.trim().to_string()).filter(|id| !id.is_empty());
        self
    }

    /// Channel for "still generating" and other turn progress
    pub fn progress(&self) -> &ProgressBus {
        &self.progress
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Forget the conversation history
    pub fn reset(&mut self) {
        self.context.clear();
        info!("Conversation history cleared");
    }

    /// Models the text backend currently serves from the configured set
    pub async fn available_models(&self) -> Result<Vec<String>, EngineError> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            EngineError::ConfigurationMissing(env_var_name(TEXT_API_KEY))
        })?;
        Ok(generator.available_models().await)
    }

    /// Run one turn.
    ///
    /// # Errors
    /// - `ConfigurationMissing` if a backend or the replica id is absent
    /// - `EmptyMessage` if the user text is blank
    /// - `BackendUnavailable` / `BackendRejected` from reply generation
    /// - `Cancelled` if `cancel` fires before the reply arrives
    ///
    /// Once a reply exists the turn succeeds; video problems are reported in
    /// `TurnResult::video`.
    pub async fn handle_turn(
        &mut self,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnResult, EngineError> {
        let Self {
            context,
            generator,
            video,
            poller,
            replica_id,
            progress,
            ..
        } = self;
        let (generator, video, poller, replica_id) = Self::dependencies(
            generator.as_ref(),
            video.as_ref(),
            poller.as_ref(),
            replica_id.as_deref(),
        )?;

        let user_text = request.user_text.trim();
        if user_text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }

        let turn_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        info!(
            turn_id = %turn_id,
            model = %request.model,
            tone = %request.tone,
            want_video = request.want_video,
            history = context.turn_count(),
            "Turn started"
        );
        progress.publish(ProgressEvent::TurnStarted {
            turn_id: turn_id.clone(),
        });

        let instruction = request.system_instruction.as_deref();
        let messages = context.assemble_with(instruction, user_text);
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(turn_id = %turn_id, "Turn cancelled before reply");
                return Err(EngineError::Cancelled);
            }
            reply = generator.generate(&messages, &request.model, request.tone) => reply,
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                warn!(turn_id = %turn_id, "Turn failed, history unchanged: {}", e);
                return Err(e);
            }
        };

        context.commit(user_text, reply.as_str());
        context.set_system_instruction(instruction);
        context.set_model(request.model.as_str());
        context.set_tone(request.tone);
        progress.publish(ProgressEvent::ReplyReady {
            turn_id: turn_id.clone(),
        });

        let video_outcome = if request.want_video {
            let outcome =
                Self::produce_video(&turn_id, &reply, video, poller, replica_id, progress, cancel)
                    .await;
            progress.publish(ProgressEvent::VideoFinished {
                turn_id: turn_id.clone(),
                outcome: outcome.clone(),
            });
            outcome
        } else {
            VideoOutcome::Absent
        };

        info!(
            turn_id = %turn_id,
            duration_ms = start.elapsed().as_millis() as u64,
            history = context.turn_count(),
            video = video_outcome.locator().is_some(),
            "Turn finished"
        );

        Ok(TurnResult {
            turn_id,
            reply,
            video: video_outcome,
        })
    }

    /// Submit the reply and poll it; every failure becomes an outcome
    async fn produce_video(
        turn_id: &str,
        reply: &str,
        video: &Arc<dyn VideoBackend>,
        poller: &VideoJobPoller,
        replica_id: &str,
        progress: &ProgressBus,
        cancel: &CancellationToken,
    ) -> VideoOutcome {
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(turn_id, "Video cancelled before submission finished");
                return VideoOutcome::Cancelled { job_id: None };
            }
            result = video.submit(reply, replica_id) => result,
        };

        let job_id = match submitted {
            Ok(job_id) => job_id,
            Err(e) => {
                let reason = EngineError::from(e).to_string();
                warn!(turn_id, backend = video.name(), "Video not submitted: {}", reason);
                return VideoOutcome::Failed {
                    job_id: None,
                    reason,
                };
            }
        };

        progress.publish(ProgressEvent::VideoSubmitted {
            turn_id: turn_id.to_string(),
            job_id: job_id.clone(),
        });

        let mut job = VideoJob::submitted(job_id, reply);
        poller.run(&mut job, cancel).await.into_video_outcome(&job.id)
    }

    /// All three collaborators, or `ConfigurationMissing` naming what is absent
    fn dependencies<'a>(
        generator: Option<&'a ReplyGenerator>,
        video: Option<&'a Arc<dyn VideoBackend>>,
        poller: Option<&'a VideoJobPoller>,
        replica_id: Option<&'a str>,
    ) -> Result<
        (
            &'a ReplyGenerator,
            &'a Arc<dyn VideoBackend>,
            &'a VideoJobPoller,
            &'a str,
        ),
        EngineError,
    > {
        match (generator, video, poller, replica_id) {
            (Some(generator), Some(video), Some(poller), Some(replica_id)) => {
                Ok((generator, video, poller, replica_id))
            }
            (generator, video, _, replica_id) => {
                let mut missing = Vec::new();
                if generator.is_none() {
                    missing.push(env_var_name(TEXT_API_KEY));
                }
                if video.is_none() {
                    missing.push(env_var_name(VIDEO_API_KEY));
                }
                if replica_id.is_none() {
                    missing.push(env_var_name(REPLICA_ID));
                }
                Err(EngineError::ConfigurationMissing(missing.join(", ")))
            }
        }
    }
}
