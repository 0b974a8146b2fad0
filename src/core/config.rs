//! Bot configuration document: token, optional presence status, and the
//! ordered command list. Command options stay opaque here; each variant's
//! constructor parses its own blob.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::Path;

use crate::commands::CommandConfig;

/// Root of the JSON configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Platform bot token, consumed by bootstrap only.
    pub bot_token: String,
    /// Optional presence/status string shown by the bot.
    #[serde(default)]
    pub status: Option<String>,
    /// Ordered command records; insertion order is log ordering.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

impl BotConfig {
    /// Load and parse the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: BotConfig = serde_json::from_str(&contents)
            .with_context(|| format!("unable to parse config file {}", path.display()))?;
        Ok(config)
    }
}
