//! Station settings.
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! command-line overrides applied by the binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::deck::{DEFAULT_GROWTH_STEP, DEFAULT_INITIAL_CARDS, DeckLayout};

/// Card reader address used until the operator types another one.
pub const DEFAULT_SUBMIT_HOST: &str = "192.168.0.133";
/// Port the card reader listens on.
pub const DEFAULT_SUBMIT_PORT: u16 = 3505;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub submit_host: String,
    pub submit_port: u16,
    pub initial_cards: usize,
    pub growth_step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cards: Option<usize>,
    /// Give up on a telnet connect after this many seconds. Unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telnet_connect_timeout_secs: Option<u64>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            submit_host: DEFAULT_SUBMIT_HOST.to_string(),
            submit_port: DEFAULT_SUBMIT_PORT,
            initial_cards: DEFAULT_INITIAL_CARDS,
            growth_step: DEFAULT_GROWTH_STEP,
            max_cards: None,
            telnet_connect_timeout_secs: None,
        }
    }
}

impl StationConfig {
    /// Read and validate a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_cards == 0 {
            return Err(ConfigError::Invalid(
                "initial_cards must be at least 1".to_string(),
            ));
        }
        if self.growth_step == 0 {
            return Err(ConfigError::Invalid(
                "growth_step must be at least 1".to_string(),
            ));
        }
        if self.submit_port == 0 {
            return Err(ConfigError::Invalid("submit_port must not be 0".to_string()));
        }
        if self.submit_host.trim().is_empty() {
            return Err(ConfigError::Invalid("submit_host must not be empty".to_string()));
        }
        if let Some(max) = self.max_cards {
            if max < self.initial_cards {
                return Err(ConfigError::Invalid(format!(
                    "max_cards ({}) must not be below initial_cards ({})",
                    max, self.initial_cards
                )));
            }
        }
        Ok(())
    }

    pub fn deck_layout(&self) -> DeckLayout {
        DeckLayout {
            initial_cards: self.initial_cards,
            growth_step: self.growth_step,
            max_cards: self.max_cards,
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.telnet_connect_timeout_secs.map(Duration::from_secs)
    }
}
