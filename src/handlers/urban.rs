//! `ud <term>` / `ud -random`: Urban Dictionary lookup.

use async_trait::async_trait;
use serde::Deserialize;

use super::{Context, Handler, HandlerError, HandlerResult};

#[derive(Debug, Deserialize)]
struct Definitions {
    #[serde(default)]
    list: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    word: String,
    definition: String,
    permalink: String,
    #[serde(default)]
    thumbs_up: i64,
}

impl Definition {
    /// Definitions carry `\r\n` and `[bracketed]` cross-links.
    fn flattened(&self) -> String {
        self.definition
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(['[', ']'], "")
    }
}

/// Highest `thumbs_up` wins; the first listed wins ties.
fn top_voted(mut list: Vec<Definition>) -> Option<Definition> {
    list.sort_by(|a, b| b.thumbs_up.cmp(&a.thumbs_up));
    list.into_iter().next()
}

pub struct UrbanHandler;

#[async_trait]
impl Handler for UrbanHandler {
    fn usage(&self) -> &'static str {
        "ud <term> | ud -random"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.args.is_empty() {
            return ctx.reply_usage(self.usage()).await;
        }

        let base = ctx.state.endpoints.urban_dictionary.trim_end_matches('/');
        let random = ctx.args == "-random";
        let request = if random {
            ctx.state.http.get(format!("{base}/random"))
        } else {
            ctx.state
                .http
                .get(format!("{base}/define"))
                .query(&[("term", ctx.args)])
        };

        let defs = match tokio::time::timeout(ctx.state.http_timeout(), async {
            request.send().await?.error_for_status()?.json::<Definitions>().await
        })
        .await
        {
            Ok(Ok(defs)) => defs,
            Ok(Err(e)) => return ctx.reply_fallback(e.into()).await,
            Err(_) => return ctx.reply_fallback(HandlerError::Timeout).await,
        };

        let Some(top) = top_voted(defs.list) else {
            return ctx
                .reply_fallback(HandlerError::BadResponse(format!("no definitions for {:?}", ctx.args)))
                .await;
        };

        let text = if random {
            format!("{}: {}", top.word, top.flattened())
        } else {
            top.flattened()
        };
        ctx.reply(&text).await?;
        ctx.reply(&top.permalink).await
    }
}
