//! Command handler registry and dispatch.
//!
//! The `Registry` maps command tokens to handlers and keeps per-command
//! usage counters.

use super::{
    Context, Handler, HandlerResult, admin::AdminHandler, figlet::FigletHandler,
    help::HelpHandler, spell::SpellHandler, uptime::UptimeHandler, url::UrlHandler,
    urban::UrbanHandler, version::VersionHandler, wiki::WikiHandler,
};
use crate::dispatch::InboundLine;
use crate::network::ClientHandle;
use crate::state::BotState;
use crate::telemetry::{CommandTimer, spans};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug};

/// Split `text` into a command token and its argument string.
///
/// The first whitespace-separated token must start with `prefix` and have
/// something after it. The remaining tokens are rejoined with single spaces.
pub fn parse_command(prefix: char, text: &str) -> Option<(&str, String)> {
    let mut parts = text.split_whitespace();
    let name = parts.next()?.strip_prefix(prefix)?;
    if name.is_empty() {
        return None;
    }
    let args = parts.collect::<Vec<_>>().join(" ");
    Some((name, args))
}

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
    /// Command usage counters.
    command_counts: HashMap<&'static str, Arc<AtomicU64>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Link archive
        handlers.insert("url", Box::new(UrlHandler));

        // Administration
        handlers.insert("admin", Box::new(AdminHandler));

        // Bot info
        handlers.insert("help", Box::new(HelpHandler));
        handlers.insert("version", Box::new(VersionHandler));
        handlers.insert("uptime", Box::new(UptimeHandler));

        // Text tools
        handlers.insert("sp", Box::new(SpellHandler));
        handlers.insert("fig", Box::new(FigletHandler));

        // Lookups
        handlers.insert("wp", Box::new(WikiHandler));
        handlers.insert("ud", Box::new(UrbanHandler));

        let mut command_counts = HashMap::new();
        for &cmd in handlers.keys() {
            command_counts.insert(cmd, Arc::new(AtomicU64::new(0)));
        }

        Self {
            handlers,
            command_counts,
        }
    }

    /// Registered command tokens, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Usage text (without prefix) for a command.
    pub fn usage(&self, name: &str) -> Option<&'static str> {
        self.handlers.get(name).map(|h| h.usage())
    }

    /// Command usage statistics, most used first.
    pub fn get_command_stats(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .command_counts
            .iter()
            .map(|(cmd, count)| (*cmd, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        stats
    }

    /// Route one inbound line to its handler, if it names one.
    ///
    /// Lines without the prefix, unknown tokens and lines with no reply
    /// target are dropped quietly.
    pub async fn dispatch(
        &self,
        state: &BotState,
        client: &ClientHandle,
        line: &InboundLine,
    ) -> HandlerResult {
        let Some((name, args)) = parse_command(state.prefix(), &line.text) else {
            return Ok(());
        };

        let Some((&name, handler)) = self.handlers.get_key_value(name) else {
            debug!(command = %name, "Unknown command");
            return Ok(());
        };

        let Some(reply_to) = line.reply_target() else {
            debug!(command = %name, target = %line.target, "No reply target, dropping command");
            return Ok(());
        };

        if let Some(counter) = self.command_counts.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let ctx = Context {
            state,
            client,
            line,
            reply_to,
            args: &args,
            registry: self,
        };

        let span = spans::command(name, &line.nick, Some(line.target.as_str()));
        let _timer = CommandTimer::new(name);

        let result = handler.handle(&ctx).instrument(span).await;

        if let Err(ref e) = result {
            crate::metrics::record_command_error(name, e.error_code());
            debug!(command = %name, error = %e, "Command error");
        }

        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{SERVER, outbound, run, state};

    #[test]
    fn parse_command_splits_token_and_args() {
        assert_eq!(
            parse_command('?', "?url   alice  bob"),
            Some(("url", "alice bob".to_string()))
        );
        assert_eq!(parse_command('?', "?help"), Some(("help", String::new())));
        assert_eq!(parse_command('!', "  !sp teh "), Some(("sp", "teh".to_string())));
    }

    #[test]
    fn parse_command_requires_prefix_and_name() {
        assert_eq!(parse_command('?', "url alice"), None);
        assert_eq!(parse_command('?', "? url"), None);
        assert_eq!(parse_command('?', "what?url"), None);
        assert_eq!(parse_command('?', ""), None);
    }

    #[test]
    fn names_are_sorted_and_complete() {
        assert_eq!(
            Registry::new().names(),
            vec!["admin", "fig", "help", "sp", "ud", "uptime", "url", "version", "wp"]
        );
    }

    #[tokio::test]
    async fn unknown_command_is_silent() {
        let state = state().await;
        assert!(outbound(&state, "bob", "#test", "?notarealcommand foo").await.is_empty());
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let state = state().await;
        assert!(outbound(&state, "bob", "#test", "?VERSION").await.is_empty());
    }

    #[tokio::test]
    async fn private_message_replies_to_sender() {
        let state = state().await;
        let sent = run(&state, "bob", "scumbag", "?version").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "bob");
    }

    #[tokio::test]
    async fn missing_reply_target_is_dropped() {
        let state = state().await;
        assert!(outbound(&state, "", "scumbag", "?version").await.is_empty());
    }

    #[tokio::test]
    async fn dispatch_counts_commands() {
        let state = state().await;
        let registry = Registry::new();
        let (client, _rx) = ClientHandle::detached(SERVER, 16);

        for text in ["?version", "?version", "?uptime", "?nope"] {
            let line = InboundLine::new(SERVER, "#test", "bob", text);
            registry.dispatch(&state, &client, &line).await.unwrap();
        }

        assert_eq!(
            registry.get_command_stats(),
            vec![("version", 2), ("uptime", 1)]
        );
    }
}
