//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity and behaviour shared by every session.
    #[serde(default)]
    pub bot: BotConfig,
    /// Link archive storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Per-line fan-out limits.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// External programs used by commands.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// One entry per IRC server.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// `[bot]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Nick used on servers without their own `nick`.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Command prefix character (e.g. `?url`).
    #[serde(default = "default_prefix")]
    pub prefix: char,
    /// Nicks allowed to run `admin` commands.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Sent with QUIT on shutdown.
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus port. 0 disables the metrics server.
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            prefix: default_prefix(),
            admins: Vec::new(),
            quit_message: default_quit_message(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: 0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Lines processed at once across all sessions. 0 means unbounded.
    #[serde(default = "default_max_concurrent_lines")]
    pub max_concurrent_lines: usize,
    /// Timeout for outbound HTTP calls and helper processes.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl DispatchConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lines: default_max_concurrent_lines(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// `[tools]` section: paths to helper binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_aspell")]
    pub aspell: String,
    #[serde(default = "default_figlet")]
    pub figlet: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            aspell: default_aspell(),
            figlet: default_figlet(),
        }
    }
}

/// A `[[servers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    /// `host:port`; also the key for everything scoped by server.
    pub server: String,
    /// Overrides `bot.nick` on this server.
    pub nick: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    /// Verify the server certificate against the system roots.
    #[serde(default)]
    pub verify_cert: bool,
    /// Sent with PASS before registration.
    pub password: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Reconnect once after an unexpected disconnect.
    #[serde(default = "default_true")]
    pub reconnect: bool,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl ServerEntry {
    /// Split `server` into host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let (host, port) = self.server.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        let port = port.parse().ok()?;
        Some((host, port))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}
