//! Session configuration

use crate::error::{BridgeError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_game() -> String {
    "wump".into()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    1
}

/// Immutable settings shared by every part of a session.
///
/// The JSON layout uses PascalCase keys, e.g.
/// `{"Host": "irc.example.net:6667", "Nick": "wump", "Chan": "wumpus"}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SessionConfig {
    /// Chat server address (`host:port`)
    pub host: String,
    /// Identity the bridge registers and answers to
    pub nick: String,
    /// Channel name, stored without the leading `#`
    #[serde(rename = "Chan")]
    pub channel: String,
    /// Game program to spawn
    #[serde(default = "default_game")]
    pub game: String,
    /// Extra arguments for the game program
    #[serde(default)]
    pub game_args: Vec<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// How long to wait for the game to exit after a quit
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    /// Capacity of each outbound channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SessionConfig {
    /// Build a configuration with defaults for everything but the three
    /// required fields.
    pub fn new(host: impl Into<String>, nick: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            nick: nick.into(),
            channel: channel.into(),
            game: default_game(),
            game_args: Vec::new(),
            connect_timeout_secs: default_connect_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            channel_capacity: default_channel_capacity(),
        }
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: SessionConfig = serde_json::from_str(json)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn normalize(&mut self) {
        if let Some(stripped) = self.channel.strip_prefix('#') {
            self.channel = stripped.to_string();
        }
        if self.channel_capacity == 0 {
            self.channel_capacity = 1;
        }
    }

    /// Check that every field spliced into protocol lines is a single word
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::Config("Host must not be empty".into()));
        }
        check_word("Nick", &self.nick)?;
        check_word("Chan", &self.channel)?;
        if self.game.trim().is_empty() {
            return Err(BridgeError::Config("Game must not be empty".into()));
        }
        Ok(())
    }

    /// Channel name with its `#` prefix
    pub fn channel_target(&self) -> String {
        format!("#{}", self.channel)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn check_word(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BridgeError::Config(format!("{} must not be empty", field)));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == ',' || *c == ':')
    {
        return Err(BridgeError::Config(format!(
            "{} contains invalid character {:?}",
            field, c
        )));
    }
    Ok(())
}
