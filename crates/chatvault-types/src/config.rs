//! Configuration types for ChatVault.
//!
//! `ChatVaultConfig` holds the document store and completion service
//! settings. Loading (file + environment) lives in `chatvault-infra::config`;
//! this module only defines the shape, the defaults, and validation.

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

pub const DEFAULT_DATABASE: &str = "ChatHistoryDB";
pub const DEFAULT_CONTAINER: &str = "Conversations";
pub const DEFAULT_API_VERSION: &str = "2024-10-15-preview";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Document store (Cosmos DB) settings.
#[derive(Debug)]
pub struct CosmosSettings {
    /// Account endpoint, e.g. `https://myaccount.documents.azure.com:443/`.
    pub endpoint: String,
    /// Base64 master key.
    pub key: SecretString,
    pub database: String,
    pub container: String,
}

impl Default for CosmosSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: SecretString::from(String::new()),
            database: DEFAULT_DATABASE.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
        }
    }
}

/// Completion service (Azure OpenAI) settings.
#[derive(Debug)]
pub struct AzureOpenAiSettings {
    pub endpoint: String,
    pub api_key: SecretString,
    /// Deployment name used as the model identifier.
    pub deployment: String,
    pub api_version: String,
}

impl Default for AzureOpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: SecretString::from(String::new()),
            deployment: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug)]
pub struct ChatVaultConfig {
    pub cosmos: CosmosSettings,
    pub openai: AzureOpenAiSettings,
    /// Log verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
}

impl Default for ChatVaultConfig {
    fn default() -> Self {
        Self {
            cosmos: CosmosSettings::default(),
            openai: AzureOpenAiSettings::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ChatVaultConfig {
    /// Fail fast on the first empty required setting.
    ///
    /// Errors name the environment variable that supplies the setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 8] = [
            ("COSMOS_DB_ENDPOINT", &self.cosmos.endpoint),
            ("COSMOS_DB_KEY", self.cosmos.key.expose_secret()),
            ("CHAT_HISTORY_DATABASE", &self.cosmos.database),
            ("CHAT_HISTORY_CONTAINER", &self.cosmos.container),
            ("AZURE_OPENAI_ENDPOINT", &self.openai.endpoint),
            ("AZURE_OPENAI_API_KEY", self.openai.api_key.expose_secret()),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", &self.openai.deployment),
            ("AZURE_OPENAI_API_VERSION", &self.openai.api_version),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        Ok(())
    }
}
