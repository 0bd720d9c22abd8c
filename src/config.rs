//! Client configuration.
//!
//! Loaded from `<config dir>/schema-model/config.json` when present, then
//! overridden by environment variables:
//! - `SCHEMA_MODEL_URL` - Base URL of the REST backend
//! - `SCHEMA_MODEL_API_KEY` - Bearer token (optional)
//! - `SCHEMA_MODEL_TIMEOUT_SECS` - Request timeout

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "schema-model";
const CONFIG_FILE: &str = "config.json";

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:17010/api/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every resource path is appended to
    pub base_url: String,
    /// API key sent as a bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the user's config directory, then apply
    /// environment overrides. Falls back to defaults if the file is missing
    /// or fails to parse.
    pub fn load() -> Self {
        let base = match get_config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("SCHEMA_MODEL_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("SCHEMA_MODEL_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(secs) = lookup("SCHEMA_MODEL_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeout_secs = secs;
        }
        self
    }

    /// Load the file at `path`, apply `change`, and write it back.
    ///
    /// Environment overrides are not applied, so they never end up in the
    /// file.
    pub fn edit(path: &Path, change: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut config = Self::load_from(path)?;
        change(&mut config);
        config.save_to(path)?;
        Ok(config)
    }

    /// Save the configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

/// Path of the per-user configuration file.
pub fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url": "https://api.example.com"}"#).unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ClientConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("SCHEMA_MODEL_URL", "http://remote/api"),
            ("SCHEMA_MODEL_API_KEY", "secret"),
            ("SCHEMA_MODEL_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://remote/api");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_edit_creates_then_updates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema-model").join("config.json");

        let first = ClientConfig::edit(&path, |c| c.base_url = "http://one/api".into()).unwrap();
        assert_eq!(first.timeout_secs, 30);

        let second = ClientConfig::edit(&path, |c| c.api_key = Some("k".into())).unwrap();
        assert_eq!(second.base_url, "http://one/api");
        assert_eq!(ClientConfig::load_from(&path).unwrap(), second);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = ClientConfig {
            api_key: Some("k".into()),
            ..ClientConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap(), config);
    }
}
