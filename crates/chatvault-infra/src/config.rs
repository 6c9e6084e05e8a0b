//! Configuration loader for ChatVault.
//!
//! Reads an optional TOML file into [`ChatVaultConfig`], then applies
//! environment overrides. Environment variables always win over the file.
//! Validation is left to [`ChatVaultConfig::validate`] so callers decide
//! when to fail.

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use chatvault_types::config::ChatVaultConfig;
use chatvault_types::error::ConfigError;

/// Shape of the optional config file. Every key may be omitted.
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    log_level: Option<String>,
    cosmos: FileCosmos,
    openai: FileOpenAi,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileCosmos {
    endpoint: Option<String>,
    key: Option<String>,
    database: Option<String>,
    container: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileOpenAi {
    endpoint: Option<String>,
    api_key: Option<String>,
    deployment: Option<String>,
    api_version: Option<String>,
}

/// Load configuration from `path` (if given) and the process environment.
pub async fn load_config(path: Option<&Path>) -> Result<ChatVaultConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok()).await
}

/// Same as [`load_config`] with an injectable variable lookup.
pub async fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ChatVaultConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = match path {
        Some(path) => read_file(path).await?,
        None => FileConfig::default(),
    };

    let mut config = ChatVaultConfig::default();
    apply_file(&mut config, file);
    apply_env(&mut config, lookup);
    Ok(config)
}

async fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let file = toml::from_str::<FileConfig>(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    tracing::debug!("Loaded config file {}", path.display());
    Ok(file)
}

fn apply_file(config: &mut ChatVaultConfig, file: FileConfig) {
    let FileConfig {
        log_level,
        cosmos,
        openai,
    } = file;

    set(&mut config.log_level, log_level);

    set(&mut config.cosmos.endpoint, cosmos.endpoint);
    if let Some(key) = cosmos.key {
        config.cosmos.key = SecretString::from(key);
    }
    set(&mut config.cosmos.database, cosmos.database);
    set(&mut config.cosmos.container, cosmos.container);

    set(&mut config.openai.endpoint, openai.endpoint);
    if let Some(key) = openai.api_key {
        config.openai.api_key = SecretString::from(key);
    }
    set(&mut config.openai.deployment, openai.deployment);
    set(&mut config.openai.api_version, openai.api_version);
}

fn apply_env<F>(config: &mut ChatVaultConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Set-but-empty variables are ignored.
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    set(&mut config.cosmos.endpoint, var("COSMOS_DB_ENDPOINT"));
    if let Some(key) = var("COSMOS_DB_KEY") {
        config.cosmos.key = SecretString::from(key);
    }
    set(&mut config.cosmos.database, var("CHAT_HISTORY_DATABASE"));
    set(&mut config.cosmos.container, var("CHAT_HISTORY_CONTAINER"));

    set(&mut config.openai.endpoint, var("AZURE_OPENAI_ENDPOINT"));
    if let Some(key) = var("AZURE_OPENAI_API_KEY") {
        config.openai.api_key = SecretString::from(key);
    }
    set(&mut config.openai.deployment, var("AZURE_OPENAI_DEPLOYMENT_NAME"));
    set(&mut config.openai.api_version, var("AZURE_OPENAI_API_VERSION"));

    if let Some(level) = var("LOGLEVEL") {
        config.log_level = level.to_lowercase();
    }
}

fn set(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}
