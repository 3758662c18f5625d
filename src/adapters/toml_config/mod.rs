// TOML config adapter - Profile configuration from TOML files and environment

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "transmux.toml";

/// Layout of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    profile: Profile,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter {
    config_file_path: Arc<RwLock<Option<PathBuf>>>,
    env: fn(&str) -> Option<String>,
}

impl TomlConfigAdapter {
    pub fn new() -> Self {
        Self {
            config_file_path: Arc::new(RwLock::new(None)),
            env: |key| std::env::var(key).ok(),
        }
    }

    /// Replace the environment lookup
    pub fn with_env(mut self, env: fn(&str) -> Option<String>) -> Self {
        self.env = env;
        self
    }

    fn get_default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Parse a `[profile]` table; missing keys keep their defaults
    pub fn parse_profile(toml_content: &str) -> Result<Profile, DomainError> {
        let parsed: ConfigFile = toml::from_str(toml_content)
            .map_err(|e| DomainError::ConfigFail(format!("Failed to parse TOML config: {}", e)))?;
        Ok(parsed.profile)
    }

    /// Apply `TRANSMUX_*` overrides on top of `profile`
    fn apply_env_overrides(&self, profile: &mut Profile) -> Result<(), DomainError> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError> {
            value
                .trim()
                .parse()
                .map_err(|_| DomainError::ConfigFail(format!("Invalid value for {}: {}", key, value)))
        }

        let env = self.env;
        if let Some(value) = env("TRANSMUX_WIDTH") {
            profile.width = number("TRANSMUX_WIDTH", &value)?;
        }
        if let Some(value) = env("TRANSMUX_HEIGHT") {
            profile.height = number("TRANSMUX_HEIGHT", &value)?;
        }
        if let Some(value) = env("TRANSMUX_BITRATE") {
            profile.bit_rate = number("TRANSMUX_BITRATE", &value)?;
        }
        if let Some(value) = env("TRANSMUX_FPS") {
            profile.frame_rate = number("TRANSMUX_FPS", &value)?;
        }
        if let Some(value) = env("TRANSMUX_GOP") {
            profile.gop_size = number("TRANSMUX_GOP", &value)?;
        }
        if let Some(value) = env("TRANSMUX_ENCODER") {
            profile.encoder = value;
        }
        if let Some(value) = env("TRANSMUX_PRESET") {
            profile.preset = Some(value);
        }
        Ok(())
    }

    fn remember_path(&self, path: PathBuf) {
        if let Ok(mut current) = self.config_file_path.write() {
            *current = Some(path);
        }
    }
}

impl Default for TomlConfigAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigPort for TomlConfigAdapter {
    async fn load_profile(&self, config_file: Option<&Path>) -> Result<Profile, DomainError> {
        let mut profile = match config_file {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    DomainError::ConfigFail(format!(
                        "Failed to read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                self.remember_path(path.to_path_buf());
                Self::parse_profile(&content)?
            }
            None => {
                let path = Self::get_default_config_path();
                match tokio::fs::read_to_string(&path).await {
                    Ok(content) => {
                        tracing::debug!("Using config file {}", path.display());
                        self.remember_path(path);
                        Self::parse_profile(&content)?
                    }
                    Err(_) => Profile::default(),
                }
            }
        };

        self.apply_env_overrides(&mut profile)?;
        Ok(profile)
    }

    async fn get_config_file_path(&self) -> Result<String, DomainError> {
        let config_path = self
            .config_file_path
            .read()
            .map_err(|_| DomainError::InternalError("Config path lock poisoned".to_string()))?;
        Ok(config_path
            .clone()
            .unwrap_or_else(Self::get_default_config_path)
            .to_string_lossy()
            .to_string())
    }
}
