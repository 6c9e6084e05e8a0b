//! ChatVault CLI entry point.
//!
//! Binary name: `chatvault`
//!
//! Loads `.env`, the optional config file and the environment, validates the
//! result, connects the store, then dispatches to the command handler.

mod cli;
mod state;

use anyhow::Context;
use clap::Parser;

use chatvault_infra::config::load_config;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    config.validate()?;

    let log_level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    chatvault_observe::init_tracing(log_level, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init(&config)
        .await
        .context("Failed to connect to the conversation store")?;

    let result = run(&state, cli.command, cli.json).await;

    // Release clients even when the command failed; its error wins.
    let closed = state.shutdown().await;
    chatvault_observe::shutdown_tracing();
    result.and(closed)
}

async fn run(state: &AppState, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Create { owner, messages } => {
            cli::conversation::create(state, &owner.owner, &messages, json).await
        }
        Commands::List { owner, limit, offset } => {
            cli::conversation::list(state, &owner.owner, limit, offset, json).await
        }
        Commands::Show { id, owner } => cli::conversation::show(state, &owner.owner, &id, json).await,
        Commands::Rename { id, title, owner } => {
            cli::conversation::rename(state, &owner.owner, &id, &title, json).await
        }
        Commands::Delete { id, owner } => {
            cli::conversation::delete(state, &owner.owner, &id, json).await
        }
        Commands::AddMessage {
            id,
            content,
            role,
            owner,
        } => cli::conversation::add_message(state, &owner.owner, &id, &role, &content, json).await,
        Commands::Messages { id, owner, limit } => {
            cli::conversation::messages(state, &owner.owner, &id, limit, json).await
        }
    }
}
