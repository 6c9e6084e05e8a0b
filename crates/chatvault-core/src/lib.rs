//! Business logic and trait definitions for ChatVault.
//!
//! This crate defines the "ports" (the document store and completion
//! provider traits) that the infrastructure layer implements, plus the
//! conversation manager that orchestrates them. It depends only on
//! `chatvault-types` -- never on `chatvault-infra` or any network crate.

pub mod conversation;
pub mod llm;
pub mod title;
