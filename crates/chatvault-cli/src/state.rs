//! Application state wiring the manager to its clients.
//!
//! The manager is generic over the store; AppState pins it to the Cosmos DB
//! implementation and attaches the Azure OpenAI title generator.

use chatvault_core::conversation::manager::ConversationManager;
use chatvault_infra::cosmos::CosmosConversationStore;
use chatvault_infra::llm::create_title_generator;
use chatvault_types::config::ChatVaultConfig;

/// Concrete manager type used by every command.
pub type ConcreteManager = ConversationManager<CosmosConversationStore>;

pub struct AppState {
    pub manager: ConcreteManager,
}

impl AppState {
    /// Build the clients from a validated config and connect the store.
    pub async fn init(config: &ChatVaultConfig) -> anyhow::Result<Self> {
        let store = CosmosConversationStore::new(&config.cosmos);
        let titles = create_title_generator(&config.openai);

        let manager = ConversationManager::new(store, Some(titles));
        manager.initialize().await?;

        Ok(Self { manager })
    }

    /// Release the store session and the completion client.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.manager.close().await?;
        Ok(())
    }
}
