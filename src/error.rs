//! Unified error handling for scumbag.
//!
//! Layer errors (`ConfigError`, `DbError`, `NetworkError`, `SpellError`) live
//! beside their modules; this module holds the command and process-level
//! enums that wrap them.

use thiserror::Error;

use crate::config::ConfigError;
use crate::config::validation::ValidationError;
use crate::db::DbError;
use crate::network::NetworkError;
use crate::spell::SpellError;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("send error: {0}")]
    Send(#[from] NetworkError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("spell check failed: {0}")]
    Spell(#[from] SpellError),

    #[error("external tool failed: {0}")]
    Tool(String),

    #[error("unexpected response: {0}")]
    BadResponse(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::Send(_) => "send_error",
            Self::Http(_) => "http_error",
            Self::Timeout => "timeout",
            Self::Spell(_) => "spell_error",
            Self::Tool(_) => "tool_error",
            Self::BadResponse(_) => "bad_response",
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Process Errors
// ============================================================================

/// Errors that stop the bot.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("no server could be connected")]
    NoServersConnected,
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ValidationError>> for BotError {
    fn from(errors: Vec<ValidationError>) -> Self {
        BotError::Validation(errors)
    }
}
