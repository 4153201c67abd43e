use serde::{Deserialize, Serialize};

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::repository::{JsonFileStore, KeyValueStore, MemoryStore};

const ENV_PREFIX: &str = "PAGE_NOTES_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// JSON file the notes are kept in; notes live in memory when unset
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

const fn default_port() -> u16 {
    8000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            storage_path: None,
            quota_bytes: None,
        }
    }
}

impl Config {
    pub fn build_store(&self) -> Arc<dyn KeyValueStore> {
        match (&self.storage_path, self.quota_bytes) {
            (Some(path), quota) => Arc::new(JsonFileStore::new(path, quota)),
            (None, Some(quota)) => Arc::new(MemoryStore::with_quota(quota)),
            (None, None) => Arc::new(MemoryStore::new()),
        }
    }
}

pub fn parse_config(contents: &str) -> Result<Config, serde_yaml::Error> {
    serde_yaml::from_str(contents)
}

fn read_config_file(path: impl AsRef<Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents).map_err(Into::into)
}

fn load_from_env_vars<I>(vars: I) -> Result<Config, envy::Error>
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX).from_iter(vars)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("PAGE_NOTES_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return read_config_file(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_config_file("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        return read_config_file("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    match load_from_env_vars(env::vars()) {
        Ok(config) => {
            tracing::info!("Successfully loaded configuration from environment variables");
            Ok(config)
        }
        Err(e) => Err(format!(
            "Config file not found and environment variables are invalid. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and {ENV_PREFIX}* variables. \
             Error: {e}"
        )
        .into()),
    }
}
