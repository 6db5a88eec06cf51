//! `uptime`

use std::time::Duration;

use async_trait::async_trait;

use super::{Context, Handler, HandlerResult};

/// `N days, HH:MM:SS`
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    format!("{days} days, {hours:02}:{minutes:02}:{seconds:02}")
}

pub struct UptimeHandler;

#[async_trait]
impl Handler for UptimeHandler {
    fn usage(&self) -> &'static str {
        "uptime"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply(&format_uptime(ctx.state.uptime())).await
    }
}
