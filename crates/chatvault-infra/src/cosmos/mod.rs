//! Cosmos DB (SQL API) implementation of the conversation store.
//!
//! Talks to the REST API directly: [`auth`] signs requests with the account
//! master key, [`client`] wraps the handful of resource calls the store
//! needs, and [`store`] maps conversation and message documents onto them.

pub mod auth;
pub mod client;
pub mod store;

pub use store::CosmosConversationStore;
