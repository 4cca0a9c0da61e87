use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::error::{CleaningError, Result};

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which artifact store backend the step talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Fs,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root directory for local store state (objects, catalog, staging, run log).
    pub data_root: PathBuf,
    /// Base URL of the remote store. Required when backend is "http".
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            data_root: PathBuf::from("data"),
            base_url: None,
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Reads `config.toml` when present, falling back to built-in defaults.
    /// Environment variables override either.
    pub fn load_or_default() -> Result<Self> {
        let mut config = match fs::read_to_string(CONFIG_PATH) {
            Ok(raw) => toml::from_str(&raw)?,
            Err(_) => Config::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var("LISTINGS_DATA_ROOT") {
            self.store.data_root = PathBuf::from(root);
        }
        if let Ok(url) = std::env::var("LISTINGS_STORE_URL") {
            self.store.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("LISTINGS_STORE_API_KEY") {
            self.store.api_key = Some(key);
        }
        if let Ok(backend) = std::env::var("LISTINGS_STORE_BACKEND") {
            self.store.backend = match backend.to_lowercase().as_str() {
                "fs" => StoreBackend::Fs,
                "http" => StoreBackend::Http,
                other => {
                    return Err(CleaningError::Config(format!(
                        "Unknown store backend '{}', expected 'fs' or 'http'",
                        other
                    )))
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_fs_store() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Fs);
        assert_eq!(config.store.data_root, PathBuf::from("data"));
        assert!(config.store.base_url.is_none());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [store]
            backend = "http"
            base_url = "https://artifacts.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(
            config.store.base_url.as_deref(),
            Some("https://artifacts.example.com")
        );
        // Untouched fields keep their defaults
        assert_eq!(config.store.timeout_seconds, 30);
    }
}
