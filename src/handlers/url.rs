//! `url <nick>` / `url /<pattern>/`: search the link archive.

use async_trait::async_trait;
use tracing::debug;

use super::{Context, Handler, HandlerResult};
use crate::archive::LinkQuery;

const URL_SEP: &str = " | ";
pub const NO_LINKS: &str = "No links found.";

pub struct UrlHandler;

#[async_trait]
impl Handler for UrlHandler {
    fn usage(&self) -> &'static str {
        "url <nick> or /<search>/"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let Some(query) = LinkQuery::parse(ctx.args) else {
            return ctx.reply_usage(self.usage()).await;
        };

        debug!(query = ?query, "Searching links");
        let links = ctx
            .state
            .archive
            .search(&query, ctx.server(), ctx.channel())
            .await?;

        if links.is_empty() {
            return ctx.reply(NO_LINKS).await;
        }

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        ctx.reply(&urls.join(URL_SEP)).await
    }
}
