//! Shared domain types for ChatVault.
//!
//! This crate contains the document shapes persisted in the conversation
//! store, the completion request/response types used for title generation,
//! the workspace configuration, and the error taxonomy shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, chrono, secrecy, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
