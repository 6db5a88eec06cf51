//! `help [command]`

use async_trait::async_trait;

use super::{Context, Handler, HandlerResult};

pub struct HelpHandler;

#[async_trait]
impl Handler for HelpHandler {
    fn usage(&self) -> &'static str {
        "help [command]"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let prefix = ctx.state.prefix();
        let topic = ctx.args.split_whitespace().next().unwrap_or("");
        let topic = topic.strip_prefix(prefix).unwrap_or(topic);

        match ctx.registry.usage(topic) {
            Some(usage) => ctx.reply_usage(usage).await,
            None => {
                let commands = ctx.registry.names().join(", ");
                ctx.reply(&format!("commands: {commands}")).await
            }
        }
    }
}
