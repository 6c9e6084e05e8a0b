//! Infrastructure layer for ChatVault.
//!
//! Contains the implementations of the ports defined in `chatvault-core`:
//! the Cosmos DB conversation store and the Azure OpenAI completion
//! provider, plus the file/environment configuration loader.

pub mod config;
pub mod cosmos;
pub mod llm;
