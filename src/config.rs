use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{LogFormat, LogLevel};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Measurement backend connection settings
    pub server: ServerSettings,

    /// Polling behavior for live views
    pub polling: PollingSettings,

    /// Logging preferences
    pub logging: LogSettings,
}

/// Connection settings for the measurement backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the backend, without the `/api` prefix
    pub base_url: String,

    /// Bearer token sent with every request; token acquisition and refresh
    /// live outside this tool
    pub api_token: Option<String>,

    /// Per-request timeout
    pub timeout_seconds: u64,
}

/// Polling behavior while a live view is active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Seconds between refresh ticks
    pub interval_seconds: u64,

    /// Window size (in minutes) a live view asks for on each tick
    pub default_minutes: i64,
}

/// Logging preferences persisted alongside the rest of the config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerSettings {
                base_url: "http://localhost:5000".to_string(),
                api_token: None,
                timeout_seconds: 30,
            },
            polling: PollingSettings {
                interval_seconds: 60,
                default_minutes: 60,
            },
            logging: LogSettings {
                level: LogLevel::Info,
                format: LogFormat::Pretty,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vitalrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(_) => {
                tracing::debug!(
                    path = %config_path.display(),
                    "config file not found, using defaults"
                );
                AppConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.base_url, deserialized.server.base_url);
        assert_eq!(
            config.polling.interval_seconds,
            deserialized.polling.interval_seconds
        );
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.server.base_url = "https://vitals.example.com".to_string();
        config.server.api_token = Some("secret".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.server.base_url, "https://vitals.example.com");
        assert_eq!(loaded.server.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load_from_file("/nonexistent/config.toml").is_err());
    }
}
