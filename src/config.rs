use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Regional API region, e.g. `eu`, `na`, `ap`.
    #[serde(default = "default_region")]
    pub region: String,
    /// Regional API shard, e.g. `eu`, `na`, `ap`, `kr`.
    #[serde(default = "default_region")]
    pub shard: String,
    /// How often the player's core-game state is refreshed.
    #[serde(default = "default_player_poll_interval")]
    pub player_poll_interval_ms: u64,
    /// How often the match is fetched and presence re-evaluated.
    #[serde(default = "default_presence_poll_interval")]
    pub presence_poll_interval_ms: u64,
    /// Overrides the platform lockfile location.
    #[serde(default)]
    pub lockfile_path: Option<PathBuf>,
    /// Overrides the built-in map/mode tables.
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

fn default_region() -> String {
    "eu".to_string()
}

fn default_player_poll_interval() -> u64 {
    1000
}

fn default_presence_poll_interval() -> u64 {
    10_000
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            shard: default_region(),
            player_poll_interval_ms: default_player_poll_interval(),
            presence_poll_interval_ms: default_presence_poll_interval(),
            lockfile_path: None,
            content_path: None,
        }
    }
}

impl SettingsConfig {
    pub fn player_poll_interval(&self) -> Duration {
        Duration::from_millis(self.player_poll_interval_ms)
    }

    pub fn presence_poll_interval(&self) -> Duration {
        Duration::from_millis(self.presence_poll_interval_ms)
    }
}

/// Discord Rich Presence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_client_id")]
    pub client_id: i64,
    #[serde(default = "default_large_image")]
    pub large_image: String,
}

fn default_client_id() -> i64 {
    1124974303222435851
}

fn default_large_image() -> String {
    crate::types::DEFAULT_LARGE_IMAGE.to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            large_image: default_large_image(),
        }
    }
}

/// Bootstrap retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Absent means retry forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay_ms: u64,
    #[serde(default = "default_not_ready_delay")]
    pub not_ready_delay_ms: u64,
    #[serde(default = "default_notice_interval")]
    pub notice_interval_ms: u64,
}

fn default_not_ready_delay() -> u64 {
    1500
}

fn default_notice_interval() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            retry_delay_ms: 0,
            not_ready_delay_ms: default_not_ready_delay(),
            notice_interval_ms: default_notice_interval(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if config.settings.player_poll_interval_ms == 0
            || config.settings.presence_poll_interval_ms == 0
        {
            anyhow::bail!("poll intervals in {} must be positive", path.display());
        }
        Ok(config)
    }

    /// Load config, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
