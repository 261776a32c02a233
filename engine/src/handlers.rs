//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive conversation loop
//! - ask: One-shot turn
//! - models: List served models from the configured set
//! - setup: Store secrets in the OS keychain
//! - doctor: Validate configuration and report credential presence

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::TurnArgs;
use crate::config::Config;
use crate::orchestrator::ConversationOrchestrator;
use crate::progress::{ProgressBus, ProgressEvent};
use crate::secrets::{
    env_var_name, Credentials, SecretManager, REPLICA_ID, TEXT_API_KEY, VIDEO_API_KEY,
};
use sdk::errors::{AvatalkErrorExt, EngineError};
use sdk::types::{Tone, TurnRequest, TurnResult, VideoOutcome};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Turn settings after applying config defaults to CLI flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSettings {
    pub model: String,
    pub tone: Tone,
    pub system: Option<String>,
    pub want_video: bool,
}

impl TurnSettings {
    /// Resolve flags against `[chat]` defaults.
    ///
    /// # Errors
    /// `EngineError::Config` for an unknown tone or a model outside `chat.models`.
    pub fn resolve(config: &Config, args: &TurnArgs) -> Result<Self, EngineError> {
        let model = args
            .model
            .clone()
            .unwrap_or_else(|| config.chat.default_model.clone());
        if !config.chat.models.contains(&model) {
            return Err(EngineError::Config(format!(
                "Unknown model '{}'. Must be one of: {}",
                model,
                config.chat.models.join(", ")
            )));
        }

        let tone = match &args.tone {
            Some(tone) => tone.parse().map_err(EngineError::Config)?,
            None => config.chat.tone(),
        };

        Ok(Self {
            model,
            tone,
            system: args.system.clone().or_else(|| config.chat.system_context.clone()),
            want_video: config.chat.generate_video && !args.no_video,
        })
    }

    pub fn request(&self, text: impl Into<String>) -> TurnRequest {
        let mut request = TurnRequest::new(text, self.model.clone())
            .with_tone(self.tone)
            .with_video(self.want_video);
        if let Some(system) = &self.system {
            request = request.with_system(system.clone());
        }
        request
    }
}

/// Resolve credentials and wire both backends
fn build_orchestrator(config: &Config) -> Result<ConversationOrchestrator, EngineError> {
    let secrets = SecretManager::default();
    let credentials = Credentials::resolve(&secrets, config)?;
    ConversationOrchestrator::from_credentials(config, &credentials)
}

/// Print an engine error with its hint, in the requested format
fn report_error(error: &EngineError, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            eprintln!("✗ {}", error);
            eprintln!("  Hint: {}", error.user_hint());
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "failed",
                "error": error.to_string(),
                "hint": error.user_hint(),
                "recoverable": error.is_recoverable(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_turn_result(result: &TurnResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", result.reply);
            match &result.video {
                VideoOutcome::Absent => {}
                VideoOutcome::Ready { locator, .. } => {
                    println!();
                    println!("▶ Video: {}", locator);
                }
                other => {
                    println!();
                    println!(
                        "⚠ Video unavailable: {}",
                        other.failure_reason().unwrap_or_default()
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "completed",
                "turn_id": result.turn_id,
                "reply": result.reply,
                "video": result.video,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Render "still generating" updates to stderr until the bus goes quiet
fn spawn_progress_printer(bus: &ProgressBus, format: OutputFormat) -> Option<JoinHandle<()>> {
    if format == OutputFormat::Json {
        return None;
    }

    let mut rx = bus.subscribe();
    Some(tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::VideoSubmitted { job_id, .. } => {
                    eprintln!("… video job {} submitted", job_id);
                }
                ProgressEvent::VideoProgress {
                    status,
                    elapsed_secs,
                    ..
                } => {
                    eprintln!("… video {} ({}s elapsed)", status, elapsed_secs);
                }
                ProgressEvent::VideoTransientMiss {
                    consecutive_failures,
                    ..
                } => {
                    eprintln!("… status check failed ({} in a row), retrying", consecutive_failures);
                }
                _ => {}
            }
        }
    }))
}

/// Ctrl-C presses for the lifetime of a command.
///
/// One listener is installed for the whole session, so the signal is never
/// left without a consumer between turns.
struct Interrupts {
    rx: mpsc::Receiver<()>,
    listener: Option<JoinHandle<()>>,
}

impl Interrupts {
    fn listen() -> Self {
        let (tx, rx) = mpsc::channel(4);
        let listener = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received");
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(()) {
                    break;
                }
            }
        });
        Self {
            rx,
            listener: Some(listener),
        }
    }

    #[cfg(test)]
    fn manual() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(4);
        (tx, Self { rx, listener: None })
    }

    /// Wait for the next press; pends forever once the listener is gone
    async fn next(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Run one turn; an interrupt cancels it
async fn run_turn(
    orchestrator: &mut ConversationOrchestrator,
    request: TurnRequest,
    interrupts: &mut Interrupts,
) -> std::result::Result<TurnResult, EngineError> {
    let cancel = CancellationToken::new();
    let turn = orchestrator.handle_turn(request, &cancel);
    tokio::pin!(turn);

    loop {
        tokio::select! {
            result = &mut turn => return result,
            _ = interrupts.next(), if !cancel.is_cancelled() => {
                tracing::info!("Cancelling turn");
                cancel.cancel();
            }
        }
    }
}

/// Next chat line, or `None` on EOF or an interrupt at the prompt
async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupts: &mut Interrupts,
) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => line.context("Failed to read input"),
        _ = interrupts.next() => Ok(None),
    }
}

/// Ask a single question
pub async fn handle_ask(
    message: String,
    args: &TurnArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let settings = TurnSettings::resolve(config, args)?;
    let mut orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            report_error(&e, format)?;
            return Err(e.into());
        }
    };
    let printer = spawn_progress_printer(orchestrator.progress(), format);
    let mut interrupts = Interrupts::listen();

    let result = run_turn(&mut orchestrator, settings.request(message), &mut interrupts).await;
    drop(orchestrator);
    if let Some(printer) = printer {
        printer.await.ok();
    }

    match result {
        Ok(result) => print_turn_result(&result, format),
        Err(e) => {
            report_error(&e, format)?;
            Err(e.into())
        }
    }
}

/// Interactive conversation loop
///
/// `/reset` clears the history, `/quit` exits. Ctrl-C during a turn cancels
/// it (a reply already shown stays in the history); Ctrl-C at the prompt exits.
pub async fn handle_chat(args: &TurnArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let settings = TurnSettings::resolve(config, args)?;
    let mut orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            report_error(&e, format)?;
            return Err(e.into());
        }
    };
    let printer = spawn_progress_printer(orchestrator.progress(), format);

    if format == OutputFormat::Text {
        println!(
            "Avatalk chat (model: {}, tone: {}, video: {})",
            settings.model,
            settings.tone,
            if settings.want_video { "on" } else { "off" }
        );
        println!("Type /reset to start over, /quit to exit.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupts = Interrupts::listen();
    loop {
        if format == OutputFormat::Text {
            print!("\nyou> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = next_input(&mut lines, &mut interrupts).await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.reset();
                if format == OutputFormat::Text {
                    println!("History cleared.");
                }
                continue;
            }
            _ => {}
        }

        match run_turn(&mut orchestrator, settings.request(line), &mut interrupts).await {
            Ok(result) => print_turn_result(&result, format)?,
            Err(e) => report_error(&e, format)?,
        }
    }

    drop(orchestrator);
    if let Some(printer) = printer {
        printer.await.ok();
    }
    Ok(())
}

/// List models
pub async fn handle_models(config: &Config, format: OutputFormat) -> Result<()> {
    let orchestrator = match build_orchestrator(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            report_error(&e, format)?;
            return Err(e.into());
        }
    };
    let models = orchestrator.available_models().await?;

    match format {
        OutputFormat::Text => {
            println!("Available models:");
            for model in &models {
                let marker = if *model == config.chat.default_model {
                    " (default)"
                } else {
                    ""
                };
                println!("  {}{}", model, marker);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "models": models,
                "default": config.chat.default_model,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Run system diagnostics
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    checks.push((
        "Version".to_string(),
        format!(
            "{} ({}, built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT_HASH"),
            env!("BUILD_TIMESTAMP")
        ),
    ));

    match config.validate() {
        Ok(()) => checks.push(("Configuration".to_string(), "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration".to_string(), "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    if let Ok(path) = Config::default_config_path() {
        let state = if path.exists() { "Exists" } else { "Missing" };
        checks.push(("Config file".to_string(), format!("{} ({})", state, path.display())));
    }

    let secrets = SecretManager::default();
    for (label, key) in [
        ("Groq API key", TEXT_API_KEY),
        ("Tavus API key", VIDEO_API_KEY),
        ("Tavus replica id", REPLICA_ID),
    ] {
        let configured = secrets.has_secret(key)
            || (key == REPLICA_ID && config.video.replica_id.is_some());
        if configured {
            checks.push((label.to_string(), "Configured".to_string()));
        } else {
            checks.push((label.to_string(), "Not configured".to_string()));
            issues.push(format!(
                "{} missing. Set {} or run 'avatalk setup'.",
                label,
                env_var_name(key)
            ));
        }
    }

    checks.push((
        "Video polling".to_string(),
        format!(
            "every {}s, up to {}s",
            config.video.poll_interval_secs, config.video.max_wait_secs
        ),
    ));

    match format {
        OutputFormat::Text => {
            println!("Avatalk Diagnostics");
            println!("===================");
            println!();

            for (check, status) in &checks {
                println!("  {:<20} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Interactive setup: store secrets in the OS keychain
pub async fn handle_setup() -> Result<()> {
    let secret_manager = SecretManager::default();

    println!("=== Avatalk Setup ===");
    println!();
    println!("Values are stored in the OS keychain (press Enter to keep the current value).");

    for (label, key) in [("Groq API key", TEXT_API_KEY), ("Tavus API key", VIDEO_API_KEY)] {
        let value = rpassword::prompt_password_stdout(&format!("  {}: ", label))
            .context("Failed to read secret")?;
        store_if_present(&secret_manager, key, &value)?;
    }

    print!("  Tavus replica id: ");
    std::io::stdout().flush()?;
    let mut replica = String::new();
    std::io::stdin().read_line(&mut replica)?;
    store_if_present(&secret_manager, REPLICA_ID, &replica)?;

    let config_path = Config::default_config_path()?;
    if !config_path.exists() {
        Config::load_or_create()?;
        println!();
        println!("Configuration written to {}", config_path.display());
    }

    println!();
    println!("Setup complete! Run 'avatalk doctor' to verify your configuration.");
    Ok(())
}

fn store_if_present(secrets: &SecretManager, key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Ok(());
    }
    secrets.set_secret(key, value)?;
    println!("    Stored in keychain.");
    Ok(())
}
