//! `version`

use async_trait::async_trait;

use super::{Context, Handler, HandlerResult};

/// Set at build time with `SCUMBAG_BUILD_TAG`, e.g. a short git hash.
const BUILD_TAG: &str = match option_env!("SCUMBAG_BUILD_TAG") {
    Some(tag) => tag,
    None => "dev",
};

pub fn version_string() -> String {
    format!("scumbag v{}-{}", env!("CARGO_PKG_VERSION"), BUILD_TAG)
}

pub struct VersionHandler;

#[async_trait]
impl Handler for VersionHandler {
    fn usage(&self) -> &'static str {
        "version"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply(&version_string()).await
    }
}
