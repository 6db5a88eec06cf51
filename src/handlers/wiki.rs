//! `wp <query>`: Wikipedia opensearch lookup.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Context, Handler, HandlerError, HandlerResult};

pub struct WikiHandler;

/// Description and URL of the first opensearch hit.
///
/// The response is `[query, [titles], [descriptions], [urls]]`.
fn first_hit(body: &Value) -> Option<(String, String)> {
    let url = body.get(3)?.get(0)?.as_str()?.to_string();
    let description = body
        .get(2)
        .and_then(|d| d.get(0))
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    Some((description, url))
}

#[async_trait]
impl Handler for WikiHandler {
    fn usage(&self) -> &'static str {
        "wp <query>"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.args.is_empty() {
            return ctx.reply_usage(self.usage()).await;
        }

        let request = ctx
            .state
            .http
            .get(&ctx.state.endpoints.wikipedia)
            .query(&[
                ("action", "opensearch"),
                ("search", ctx.args),
                ("format", "json"),
                ("limit", "1"),
                ("redirects", "resolve"),
            ])
            .send();

        let body: Value = match tokio::time::timeout(ctx.state.http_timeout(), async {
            request.await?.error_for_status()?.json::<Value>().await
        })
        .await
        {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return ctx.reply_fallback(e.into()).await,
            Err(_) => return ctx.reply_fallback(HandlerError::Timeout).await,
        };

        let Some((description, url)) = first_hit(&body) else {
            debug!(query = %ctx.args, "No Wikipedia results");
            return ctx
                .reply_fallback(HandlerError::BadResponse(format!("no results for {:?}", ctx.args)))
                .await;
        };

        if !description.is_empty() {
            ctx.reply(&description).await?;
        }
        ctx.reply(&url).await
    }
}
