//! `fig <phrase>`: ASCII banner through the figlet binary.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Context, Handler, HandlerError, HandlerResult};

pub struct FigletHandler;

#[async_trait]
impl Handler for FigletHandler {
    fn usage(&self) -> &'static str {
        "fig <phrase>"
    }

    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.args.is_empty() {
            return ctx.reply_usage(self.usage()).await;
        }

        let child = Command::new(&ctx.state.config.tools.figlet)
            .arg("--")
            .arg(ctx.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HandlerError::Tool(format!("figlet: {e}")))?;

        let output = tokio::time::timeout(ctx.state.http_timeout(), child.wait_with_output())
            .await
            .map_err(|_| HandlerError::Timeout)?
            .map_err(|e| HandlerError::Tool(format!("figlet: {e}")))?;

        if !output.status.success() {
            return Err(HandlerError::Tool(format!("figlet exited with {}", output.status)));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        for line in banner.lines().filter(|l| !l.trim().is_empty()) {
            ctx.reply(line).await?;
        }
        Ok(())
    }
}
