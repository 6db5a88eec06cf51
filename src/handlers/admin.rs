//! `admin`: ignore-list and nick management for configured admins.

use async_trait::async_trait;
use tracing::info;

use super::{Context, Handler, HandlerResult};

pub const REJECTION: &str = "You're not the boss of me.";

pub struct AdminHandler;

#[async_trait]
impl Handler for AdminHandler {
    fn usage(&self) -> &'static str {
        "admin ignore|unignore <nick> | admin ignores | admin nick <new nick>"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.is_admin() {
            info!(nick = %ctx.line.nick, "Rejected admin command from non-admin");
            return ctx.reply(REJECTION).await;
        }

        let mut parts = ctx.args.split_whitespace();
        let subcommand = parts.next().unwrap_or("");
        let target = parts.next();
        let server = ctx.server();

        match (subcommand, target) {
            ("ignore", Some(nick)) => {
                if ctx.state.db.ignores().ignore(server, nick).await? {
                    info!(server = %server, nick = %nick, by = %ctx.line.nick, "Ignoring nick");
                    ctx.reply(&format!("Ignoring: {nick}")).await
                } else {
                    ctx.reply(&format!("Already ignoring: {nick}")).await
                }
            }
            ("unignore", Some(nick)) => {
                if ctx.state.db.ignores().unignore(server, nick).await? {
                    info!(server = %server, nick = %nick, by = %ctx.line.nick, "Unignoring nick");
                    ctx.reply(&format!("Unignoring: {nick}")).await
                } else {
                    ctx.reply(&format!("Not ignoring: {nick}")).await
                }
            }
            ("ignores", None) => {
                let nicks = ctx.state.db.ignores().list(server).await?;
                if nicks.is_empty() {
                    ctx.reply("Nobody is ignored.").await
                } else {
                    ctx.reply(&format!("Ignoring: {}", nicks.join(", "))).await
                }
            }
            ("nick", Some(new_nick)) => {
                info!(server = %server, nick = %new_nick, by = %ctx.line.nick, "Changing nick");
                ctx.client.nick(new_nick).await?;
                Ok(())
            }
            _ => ctx.reply_usage(self.usage()).await,
        }
    }
}
