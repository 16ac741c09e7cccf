use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::store::ChannelId;

pub const DEFAULT_PAR: i64 = 4;
pub const DEFAULT_LOSS_SCORE: i64 = 7;

/// Scoring constants shared by the parser and the stats engine.
///
/// Changing either value rewrites every historical par, so both default to
/// the values the leaderboard has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Baseline number of guesses a game is measured against.
    pub par: i64,
    /// Score recorded for a lost game (one worse than the worst win).
    pub loss_score: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            par: DEFAULT_PAR,
            loss_score: DEFAULT_LOSS_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn from_prod_flag(prod: bool) -> Self {
        if prod {
            Environment::Prod
        } else {
            Environment::Dev
        }
    }

    fn key(self) -> &'static str {
        match self {
            Environment::Dev => "Dev",
            Environment::Prod => "Prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No '{0}' section in config")]
    MissingEnvironment(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// One environment section of `config.json`.
///
/// ```json
/// {
///     "Dev":  { "DiscordToken": "...", "GuildId": 1, "ChannelId": 2, "DatabaseName": "dev.db" },
///     "Prod": { "DiscordToken": "...", "GuildId": 1, "ChannelId": 3, "DatabaseName": "prod.db" }
/// }
/// ```
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub discord_token: String,
    pub guild_id: u64,
    pub channel_id: ChannelId,
    pub database_name: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_par")]
    pub par: i64,
    #[serde(default = "default_loss_score")]
    pub loss_score: i64,
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_page_size() -> usize {
    100
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_par() -> i64 {
    DEFAULT_PAR
}

fn default_loss_score() -> i64 {
    DEFAULT_LOSS_SCORE
}

impl Config {
    /// Reads the given environment's section from a JSON config file
    pub fn load(path: impl AsRef<Path>, environment: Environment) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw, environment)
    }

    pub fn from_json_str(raw: &str, environment: Environment) -> Result<Self, ConfigError> {
        let mut sections: HashMap<String, Config> = serde_json::from_str(raw)?;
        let config = sections
            .remove(environment.key())
            .ok_or_else(|| ConfigError::MissingEnvironment(environment.key().to_string()))?;

        if config.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroValue("PollIntervalSecs"));
        }
        if config.page_size == 0 {
            return Err(ConfigError::ZeroValue("PageSize"));
        }
        Ok(config)
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            par: self.par,
            loss_score: self.loss_score,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// The token never ends up in logs.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiscordToken=<redacted>; GuildId={}; ChannelId={}; DatabaseName={}",
            self.guild_id, self.channel_id, self.database_name
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("database_name", &self.database_name)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("page_size", &self.page_size)
            .field("listen_addr", &self.listen_addr)
            .field("par", &self.par)
            .field("loss_score", &self.loss_score)
            .finish()
    }
}
