use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MurmurError, MurmurResult};
use crate::MAX_MESSAGE_CHARS;

/// Top-level client configuration (loaded from murmur.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub bus: BusConfig,
    pub crypto: CryptoConfig,
    pub chat: ChatConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// NATS endpoint
    pub nats_url: String,
    /// Subject every participant publishes to and subscribes on
    pub topic: String,
    /// Ask the bus to durably accept published messages (JetStream)
    pub persist: bool,
    /// JetStream stream that captures `topic` when `persist` is set
    pub stream_name: String,
    /// Retention for persisted messages, in seconds
    pub stream_max_age_secs: u64,
}

/// Message codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2 iterations (default: 1000). Must match every other participant.
    pub kdf_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Local input limit in characters (at most 128)
    pub max_message_chars: usize,
    /// Input line that ends the session
    pub quit_command: String,
    /// Message published once on join
    pub greeting: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".into(),
            topic: "murmur.fanout".into(),
            persist: true,
            stream_name: "MURMUR_CHAT".into(),
            stream_max_age_secs: 24 * 3600,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: 1000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: MAX_MESSAGE_CHARS,
            quit_command: "/quit".into(),
            greeting: "joined the room".into(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl MurmurConfig {
    /// Read and validate a TOML file. `None` when the file does not exist.
    pub fn read(path: &Path) -> MurmurResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> MurmurResult<()> {
        if self.crypto.kdf_iterations == 0 {
            return Err(MurmurError::Config(
                "crypto.kdf_iterations must be at least 1".into(),
            ));
        }
        if self.bus.topic.trim().is_empty() {
            return Err(MurmurError::Config("bus.topic must not be empty".into()));
        }
        if self.chat.max_message_chars == 0 || self.chat.max_message_chars > MAX_MESSAGE_CHARS {
            return Err(MurmurError::Config(format!(
                "chat.max_message_chars must be between 1 and {MAX_MESSAGE_CHARS}"
            )));
        }
        Ok(())
    }
}
