//! CLI interface for Avatalk
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Avatalk
///
/// Chat with a hosted language model and get each reply narrated by a
/// talking-avatar video.
#[derive(Parser, Debug)]
#[command(name = "avatalk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation
    Chat {
        #[command(flatten)]
        turn: TurnArgs,
    },

    /// Ask a single question and exit
    Ask {
        /// The message to send
        message: String,

        #[command(flatten)]
        turn: TurnArgs,
    },

    /// List models the text backend serves
    Models,

    /// Store API keys and the replica id in the OS keychain
    Setup,

    /// Check configuration and credentials
    Doctor,
}

/// Per-turn options shared by `chat` and `ask`
#[derive(Args, Debug, Clone, Default)]
pub struct TurnArgs {
    /// Model identifier (must be one of chat.models)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Reply tone (Friendly, Formal, Casual, Neutral, ...)
    #[arg(short, long)]
    pub tone: Option<String>,

    /// System instruction placed ahead of the conversation
    #[arg(short, long, value_name = "TEXT")]
    pub system: Option<String>,

    /// Skip avatar video generation
    #[arg(long)]
    pub no_video: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["avatalk", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "avatalk",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/avatalk.toml",
            "models",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/avatalk.toml")));
        assert!(matches!(cli.command, Command::Models));
    }

    #[test]
    fn test_ask_with_turn_flags() {
        let cli = Cli::parse_from([
            "avatalk",
            "ask",
            "What is Rust?",
            "--model",
            "llama-3.1-8b-instant",
            "--tone",
            "casual",
            "--system",
            "Be brief",
            "--no-video",
        ]);
        if let Command::Ask { message, turn } = cli.command {
            assert_eq!(message, "What is Rust?");
            assert_eq!(turn.model.as_deref(), Some("llama-3.1-8b-instant"));
            assert_eq!(turn.tone.as_deref(), Some("casual"));
            assert_eq!(turn.system.as_deref(), Some("Be brief"));
            assert!(turn.no_video);
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_chat_defaults() {
        let cli = Cli::parse_from(["avatalk", "chat"]);
        if let Command::Chat { turn } = cli.command {
            assert!(turn.model.is_none());
            assert!(turn.tone.is_none());
            assert!(!turn.no_video);
        } else {
            panic!("Expected Chat command");
        }
    }
}
