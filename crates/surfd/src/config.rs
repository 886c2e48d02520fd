//! Application configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub modes: ModeSettings,
    #[serde(default)]
    pub game: GameSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host tick length in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Players to spawn at startup.
    #[serde(default = "default_players")]
    pub players: Vec<String>,
    /// Map name reported through the mapping API.
    #[serde(default = "default_map")]
    pub map: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeSettings {
    /// Mode extensions loaded at startup, by short name.
    #[serde(default = "default_enabled_modes")]
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    /// Signature table handed to the patch layer through the game config.
    #[serde(default = "default_signatures")]
    pub signatures: HashMap<String, String>,
}

fn default_tick_interval_ms() -> u64 {
    64
}

fn default_players() -> Vec<String> {
    vec!["player1".to_string()]
}

fn default_map() -> String {
    "surf_beginner".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled_modes() -> Vec<String> {
    vec!["CSS".to_string()]
}

fn default_signatures() -> HashMap<String, String> {
    HashMap::from([(
        "ServerMovementUnlock".to_string(),
        "\\x48\\x8B\\xC4".to_string(),
    )])
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            players: default_players(),
            map: default_map(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled_modes(),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            signatures: default_signatures(),
        }
    }
}

impl AppConfig {
    /// Loads the file when it exists, falls back to defaults otherwise.
    /// A present-but-invalid file is an error, not a silent fallback.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
    }
}
