//! Bot command handlers.
//!
//! Lines that start with the configured prefix (`?url alice`) are routed by
//! the [`Registry`] to a [`Handler`] keyed by the command token. Each handler
//! gets the rest of the line as one argument string and must cope with it
//! being empty.

mod admin;
mod figlet;
mod help;
mod registry;
mod spell;
mod uptime;
mod url;
mod urban;
mod version;
mod wiki;

pub use registry::{Registry, parse_command};
pub use uptime::format_uptime;
pub use version::version_string;

use async_trait::async_trait;
use tracing::warn;

use crate::dispatch::InboundLine;
pub use crate::error::{HandlerError, HandlerResult};
use crate::network::ClientHandle;
use crate::spell::UNKNOWN_REPLY;
use crate::state::BotState;

/// One command invocation: who asked, where to answer, and the argument string.
pub struct Context<'a> {
    /// Shared bot state.
    pub state: &'a BotState,
    /// Handle of the session the line arrived on.
    pub client: &'a ClientHandle,
    pub line: &'a InboundLine,
    /// Channel, or the sender's nick for a private message.
    pub reply_to: &'a str,
    /// Everything after the command token, joined by single spaces.
    pub args: &'a str,
    /// Command registry (for help).
    pub registry: &'a Registry,
}

impl Context<'_> {
    /// Send one line to the reply target.
    pub async fn reply(&self, text: &str) -> HandlerResult {
        self.client.privmsg(self.reply_to, text).await?;
        Ok(())
    }

    /// Send the prefixed usage text for a command.
    pub async fn reply_usage(&self, usage: &str) -> HandlerResult {
        self.reply(&format!("{}{}", self.state.prefix(), usage)).await
    }

    /// Tell the user we came up empty, then hand `err` back for logging.
    pub async fn reply_fallback(&self, err: HandlerError) -> HandlerResult {
        if let Err(e) = self.reply(UNKNOWN_REPLY).await {
            warn!(error = %e, "Failed to send fallback reply");
        }
        Err(err)
    }

    /// Server id the line arrived on.
    pub fn server(&self) -> &str {
        &self.line.server
    }

    /// Archive scope: the line's raw target.
    pub fn channel(&self) -> &str {
        &self.line.target
    }

    pub fn is_admin(&self) -> bool {
        self.state.is_admin(&self.line.nick)
    }
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Usage text without the prefix, e.g. `sp <word>`.
    fn usage(&self) -> &'static str;

    /// Handle one invocation.
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::network::Outbound;
    use crate::spell::{SpellChecker, SpellError, Verdict};

    pub const SERVER: &str = "irc.example.org:6667";

    /// Returns canned verdicts: "teh" is misspelled, "zzz" unknown, anything else fine.
    pub struct FakeSpeller;

    #[async_trait]
    impl SpellChecker for FakeSpeller {
        async fn check(&self, word: &str) -> Result<Verdict, SpellError> {
            Ok(match word {
                "teh" => Verdict::Suggestions("the, tea".into()),
                "zzz" => Verdict::Unknown,
                _ => Verdict::Correct,
            })
        }
    }

    pub async fn state_with(toml: &str) -> BotState {
        let config: Config = toml::from_str(toml).unwrap();
        let db = Database::new(":memory:").await.unwrap();
        BotState::new(config, db).with_spell_checker(Arc::new(FakeSpeller))
    }

    pub async fn state() -> BotState {
        state_with("[bot]\nadmins = [\"alice\"]\n").await
    }

    /// Run one line through the registry and collect everything queued on the session.
    pub async fn outbound(state: &BotState, nick: &str, target: &str, text: &str) -> Vec<Outbound> {
        let registry = Registry::new();
        let (client, mut rx) = ClientHandle::detached(SERVER, 64);
        let line = InboundLine::new(SERVER, target, nick, text);
        let _ = registry.dispatch(state, &client, &line).await;
        drop(client);

        let mut sent = Vec::new();
        while let Some(out) = rx.recv().await {
            sent.push(out);
        }
        sent
    }

    /// PRIVMSGs only, as (target, text).
    pub async fn run(state: &BotState, nick: &str, target: &str, text: &str) -> Vec<(String, String)> {
        outbound(state, nick, target, text)
            .await
            .into_iter()
            .filter_map(|out| match out {
                Outbound::Message(msg) => match msg.command {
                    scumbag_proto::Command::PRIVMSG(to, text) => Some((to, text)),
                    _ => None,
                },
                Outbound::Quit(_) => None,
            })
            .collect()
    }

    /// Serve `router` on an ephemeral local port; returns `http://addr`.
    pub async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    /// Texts only.
    pub async fn replies(state: &BotState, nick: &str, text: &str) -> Vec<String> {
        run(state, nick, "#test", text)
            .await
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }
}
