//! Logging setup and command timing.

use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::config::{BotConfig, LogFormat};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `bot.log_level`.
pub fn init_tracing(bot: &BotConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&bot.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match bot.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one configured server session.
    pub fn session(server: &str) -> Span {
        info_span!("session", server = %server)
    }

    /// Span for one inbound line's fan-out.
    pub fn line(server: &str, target: &str, nick: &str) -> Span {
        info_span!("line", server = %server, target = %target, nick = %nick)
    }

    /// Span for a command execution.
    pub fn command(name: &str, source: &str, target: Option<&str>) -> Span {
        if let Some(target) = target {
            info_span!("command", name = %name, source = %source, target = %target)
        } else {
            info_span!("command", name = %name, source = %source)
        }
    }
}
