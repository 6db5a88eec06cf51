//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use scumbag_proto::ChannelExt;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one [[servers]] entry is required")]
    NoServers,
    #[error("server must be host:port, got '{0}'")]
    InvalidServerAddress(String),
    #[error("server '{0}' is configured more than once")]
    DuplicateServer(String),
    #[error("channel '{channel}' on {server} must start with '#' or '&'")]
    InvalidChannel { server: String, channel: String },
    #[error("nick must not be empty ({0})")]
    EmptyNick(String),
    #[error("bot.prefix must not be whitespace")]
    WhitespacePrefix,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    if config.bot.nick.trim().is_empty() {
        errors.push(ValidationError::EmptyNick("bot.nick".to_string()));
    }
    if config.bot.prefix.is_whitespace() {
        errors.push(ValidationError::WhitespacePrefix);
    }

    let mut seen = HashSet::new();
    for entry in &config.servers {
        if entry.host_port().is_none() {
            errors.push(ValidationError::InvalidServerAddress(entry.server.clone()));
        }
        if !seen.insert(entry.server.as_str()) {
            errors.push(ValidationError::DuplicateServer(entry.server.clone()));
        }
        if let Some(nick) = &entry.nick
            && nick.trim().is_empty()
        {
            errors.push(ValidationError::EmptyNick(entry.server.clone()));
        }
        for channel in &entry.channels {
            if !channel.is_channel_name() {
                errors.push(ValidationError::InvalidChannel {
                    server: entry.server.clone(),
                    channel: channel.clone(),
                });
            }
        }
    }

    // Database path validation
    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
