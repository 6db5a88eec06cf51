//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and TOML loading
//! - [`validation`]: startup checks that collect every problem at once

mod defaults;
mod types;
pub mod validation;

pub use types::{
    BotConfig, Config, ConfigError, DatabaseConfig, DispatchConfig, LogFormat, ServerEntry,
    ToolsConfig,
};
