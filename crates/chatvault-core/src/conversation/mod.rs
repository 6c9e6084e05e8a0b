//! Conversation and message persistence for ChatVault.
//!
//! `ConversationStore` is the persistence port; `ConversationManager`
//! enforces ownership and existence rules on top of it.

pub mod manager;
pub mod memory;
pub mod store;
