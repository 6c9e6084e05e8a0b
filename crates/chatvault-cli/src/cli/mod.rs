//! CLI command definitions for the `chatvault` binary.
//!
//! Uses clap derive macros for argument parsing. Every command is scoped to
//! one owner via `--owner`.

pub mod conversation;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use chatvault_core::conversation::manager::{DEFAULT_CONVERSATION_LIMIT, DEFAULT_MESSAGE_LIMIT};

/// Store and browse chat conversations.
#[derive(Parser)]
#[command(name = "chatvault", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a TOML config file. Environment variables override its values.
    #[arg(long, global = true, env = "CHATVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "CHATVAULT_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Owner scoping shared by every command.
#[derive(Args)]
pub struct OwnerArg {
    /// Owner (user) identifier the conversation belongs to.
    #[arg(long, env = "CHATVAULT_OWNER")]
    pub owner: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a conversation, titling it from optional seed messages.
    Create {
        #[command(flatten)]
        owner: OwnerArg,

        /// Opening user message used for title generation (repeatable).
        #[arg(long = "message", short = 'm')]
        messages: Vec<String>,
    },

    /// List conversations, most recent first.
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        owner: OwnerArg,

        /// Page size.
        #[arg(long, default_value_t = DEFAULT_CONVERSATION_LIMIT)]
        limit: u32,

        /// Number of conversations to skip.
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show a conversation and its messages.
    Show {
        /// Conversation id.
        id: String,

        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Change a conversation's title.
    Rename {
        /// Conversation id.
        id: String,

        /// New title.
        title: String,

        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Delete a conversation and all of its messages.
    #[command(alias = "rm")]
    Delete {
        /// Conversation id.
        id: String,

        #[command(flatten)]
        owner: OwnerArg,
    },

    /// Append a message to a conversation.
    #[command(name = "add-message")]
    AddMessage {
        /// Conversation id.
        id: String,

        /// Message body.
        content: String,

        /// Message role (free text, e.g. "user" or "assistant").
        #[arg(long, default_value = "user")]
        role: String,

        #[command(flatten)]
        owner: OwnerArg,
    },

    /// List a conversation's messages, oldest first.
    Messages {
        /// Conversation id.
        id: String,

        #[command(flatten)]
        owner: OwnerArg,

        /// Maximum number of messages to return.
        #[arg(long, default_value_t = DEFAULT_MESSAGE_LIMIT)]
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_seed_messages() {
        let cli = Cli::try_parse_from([
            "chatvault", "create", "--owner", "U1", "-m", "Hello", "-m", "Sales?", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Create { owner, messages } => {
                assert_eq!(owner.owner, "U1");
                assert_eq!(messages, ["Hello", "Sales?"]);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_parse_otel_flag() {
        let cli = Cli::try_parse_from(["chatvault", "show", "c1", "--owner", "U1", "--otel"]).unwrap();
        assert!(cli.otel);
    }

    #[test]
    fn test_parse_list_defaults() {
        let cli = Cli::try_parse_from(["chatvault", "list", "--owner", "U1"]).unwrap();
        assert!(!cli.otel);
        match cli.command {
            Commands::List { limit, offset, .. } => {
                assert_eq!(limit, 25);
                assert_eq!(offset, 0);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_add_message_role_default() {
        let cli = Cli::try_parse_from([
            "chatvault", "add-message", "c1", "hello there", "--owner", "U1",
        ])
        .unwrap();
        match cli.command {
            Commands::AddMessage { id, content, role, .. } => {
                assert_eq!(id, "c1");
                assert_eq!(content, "hello there");
                assert_eq!(role, "user");
            }
            _ => panic!("expected add-message"),
        }
    }

    #[test]
    fn test_messages_limit_default() {
        let cli = Cli::try_parse_from(["chatvault", "messages", "c1", "--owner", "U1", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Messages { limit, .. } => assert_eq!(limit, 100),
            _ => panic!("expected messages"),
        }
    }
}
