//! `sp <word>`: explicit spell check.

use async_trait::async_trait;

use super::{Context, Handler, HandlerResult};

pub struct SpellHandler;

#[async_trait]
impl Handler for SpellHandler {
    fn usage(&self) -> &'static str {
        "sp <word>"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let Some(word) = ctx.args.split_whitespace().next() else {
            return ctx.reply_usage(self.usage()).await;
        };

        match ctx.state.speller.check(word).await {
            Ok(verdict) => ctx.reply(verdict.reply()).await,
            Err(e) => ctx.reply_fallback(e.into()).await,
        }
    }
}
