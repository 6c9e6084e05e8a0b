//! Conversation CLI commands: create, list, show, rename, delete,
//! add-message, messages.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatvault_types::conversation::{ConversationDoc, MessageDoc};

use crate::state::AppState;

const PREVIEW_CHARS: usize = 60;

/// Create a conversation, generating its title from `messages` when given.
///
/// ```bash
/// chatvault create --owner U1 -m "Hello, I'd like to discuss sales figures."
/// ```
pub async fn create(state: &AppState, owner: &str, messages: &[String], json: bool) -> Result<()> {
    let conversation = state.manager.create_conversation(owner, messages).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Created '{}'",
        style("✓").green().bold(),
        style(&conversation.title).cyan().bold()
    );
    println!("  {} {}", style("id:").dim(), conversation.id);
    println!();
    Ok(())
}

pub async fn list(state: &AppState, owner: &str, limit: u32, offset: u32, json: bool) -> Result<()> {
    let conversations = state
        .manager
        .list_conversations(owner, Some(limit), Some(offset))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations for '{}'. Start one with: {}",
            style("i").blue().bold(),
            style(owner).cyan(),
            style(format!("chatvault create --owner {owner}")).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Title").fg(Color::White),
        Cell::new("Id").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for conversation in &conversations {
        table.add_row(vec![
            Cell::new(&conversation.title).fg(Color::Cyan),
            Cell::new(&conversation.id).fg(Color::DarkGrey),
            Cell::new(updated_at(conversation)).fg(Color::White),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// Show one conversation with its messages.
pub async fn show(state: &AppState, owner: &str, id: &str, json: bool) -> Result<()> {
    let conversation = state
        .manager
        .get_conversation(id, owner)
        .await?
        .with_context(|| format!("Conversation '{id}' not found for owner '{owner}'"))?;
    let messages = state.manager.get_messages(id, owner, None).await?;

    if json {
        let export = serde_json::json!({
            "conversation": conversation,
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&export)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&conversation.title).cyan().bold());
    println!("  {} {}", style("id:").dim(), conversation.id);
    println!("  {} {}", style("updated:").dim(), updated_at(&conversation));
    println!();
    print_messages(&messages);
    Ok(())
}

pub async fn rename(state: &AppState, owner: &str, id: &str, title: &str, json: bool) -> Result<()> {
    let conversation = state.manager.rename_conversation(id, owner, title).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
    } else {
        println!(
            "  {} Renamed to '{}'",
            style("✓").green().bold(),
            style(&conversation.title).cyan()
        );
    }
    Ok(())
}

/// Delete a conversation. Messages are removed first.
pub async fn delete(state: &AppState, owner: &str, id: &str, json: bool) -> Result<()> {
    let deleted = state.manager.delete_conversation(id, owner).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "id": id, "deleted": deleted }))?
        );
        return Ok(());
    }

    if !deleted {
        bail!("Conversation '{id}' not found for owner '{owner}'");
    }
    println!("  {} Deleted conversation {}", style("✓").green().bold(), id);
    Ok(())
}

pub async fn add_message(
    state: &AppState,
    owner: &str,
    id: &str,
    role: &str,
    content: &str,
    json: bool,
) -> Result<()> {
    let message = state.manager.add_message(id, owner, role, content).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        println!(
            "  {} Added {} message {}",
            style("✓").green().bold(),
            style(&message.role).cyan(),
            style(&message.id).dim()
        );
    }
    Ok(())
}

pub async fn messages(state: &AppState, owner: &str, id: &str, limit: u32, json: bool) -> Result<()> {
    let messages = state.manager.get_messages(id, owner, Some(limit)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    println!();
    print_messages(&messages);
    Ok(())
}

fn print_messages(messages: &[MessageDoc]) {
    if messages.is_empty() {
        println!("  {} No messages", style("i").blue().bold());
        println!();
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Role").fg(Color::White),
        Cell::new("Content").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for message in messages {
        let role_color = match message.role.as_str() {
            "user" => Color::Green,
            "assistant" => Color::Cyan,
            _ => Color::Yellow,
        };
        let created = message
            .created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&message.role).fg(role_color),
            Cell::new(preview(&message.content)),
            Cell::new(created).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();
}

fn updated_at(conversation: &ConversationDoc) -> String {
    conversation
        .modified_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Single-line preview, cut on a char boundary.
fn preview(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS || line.len() < content.len() {
        let cut: String = line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}
