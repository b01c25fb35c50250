//! Configuration for the blockwise engine.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $COAP_BLOCKWISE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/coap-blockwise/config.toml
//!   3. ~/.config/coap-blockwise/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub block1: Block1Settings,
    pub endpoint: EndpointSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block1Settings {
    /// Abandon an active transfer after this long without a new block.
    pub transfer_timeout_secs: u64,
    /// Log a warning when one handler callback takes longer than this.
    /// 0 = never warn.
    pub slow_callback_warning_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Capacity of the protocol loop's request queue.
    pub queue_depth: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for Block1Settings {
    fn default() -> Self {
        Self {
            transfer_timeout_secs: 3 * 60,
            slow_callback_warning_ms: 1000,
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self { queue_depth: 64 }
    }
}

impl Block1Settings {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn slow_callback_warning(&self) -> Option<Duration> {
        (self.slow_callback_warning_ms > 0)
            .then(|| Duration::from_millis(self.slow_callback_warning_ms))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("coap-blockwise")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            EngineConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("COAP_BLOCKWISE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&EngineConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply COAP_BLOCKWISE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COAP_BLOCKWISE_BLOCK1__TRANSFER_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.block1.transfer_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("COAP_BLOCKWISE_BLOCK1__SLOW_CALLBACK_WARNING_MS") {
            if let Ok(ms) = v.parse() {
                self.block1.slow_callback_warning_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("COAP_BLOCKWISE_ENDPOINT__QUEUE_DEPTH") {
            if let Ok(depth) = v.parse() {
                self.endpoint.queue_depth = depth;
            }
        }
    }
}
