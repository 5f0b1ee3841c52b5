use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::responder::{DEFAULT_FALLBACK_DELAY, DEFAULT_REPLY_DELAY};

/// Optional user configuration. Every field has a working default, so a
/// missing file is not an error.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    /// Path to a knowledge base JSON file.
    pub knowledge_base: Option<PathBuf>,
    /// Directory for conversation history and the log file.
    pub data_dir: Option<PathBuf>,
    /// Simulated latency for knowledge base replies, in milliseconds.
    pub reply_delay_ms: Option<u64>,
    /// Simulated latency for fallback replies, in milliseconds.
    pub fallback_delay_ms: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn reply_delay(&self) -> Duration {
        self.reply_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REPLY_DELAY)
    }

    pub fn fallback_delay(&self) -> Duration {
        self.fallback_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FALLBACK_DELAY)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("gptsim").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::new();
        assert_eq!(config.reply_delay(), DEFAULT_REPLY_DELAY);
        assert_eq!(config.fallback_delay(), DEFAULT_FALLBACK_DELAY);
        assert!(config.knowledge_base.is_none());
    }

    #[test]
    fn test_partial_config_parses() {
        let config: Config = serde_json::from_str(r#"{"reply_delay_ms": 5}"#).unwrap();
        assert_eq!(config.reply_delay(), Duration::from_millis(5));
        assert_eq!(config.fallback_delay(), DEFAULT_FALLBACK_DELAY);
    }
}
