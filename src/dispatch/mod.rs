//! Per-line fan-out.
//!
//! Every inbound line starts three independent tasks: link archiving, the
//! `(sp?)` scanner, and command dispatch. They share nothing but the line
//! and the session handle, run in a `JoinSet`, and have panics caught
//! individually so one failure never reaches its siblings or the session's
//! read loop.

mod line;

pub use line::InboundLine;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::Registry;
use crate::network::ClientHandle;
use crate::spell::{UNKNOWN_REPLY, find_sp_word};
use crate::state::BotState;
use crate::telemetry::spans;

/// Fans each inbound line out to the link archive, spell scanner and router.
#[derive(Clone)]
pub struct FanOut {
    state: Arc<BotState>,
    registry: Arc<Registry>,
    /// Caps lines in flight; `None` when `max_concurrent_lines` is 0.
    limiter: Option<Arc<Semaphore>>,
}

impl FanOut {
    pub fn new(state: Arc<BotState>, registry: Arc<Registry>) -> Self {
        let limit = state.config.dispatch.max_concurrent_lines;
        let limiter = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        Self {
            state,
            registry,
            limiter,
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Start processing `line` and return at once.
    ///
    /// The returned handle resolves when all three tasks have finished; the
    /// session ignores it.
    pub fn dispatch(&self, client: ClientHandle, line: InboundLine) -> JoinHandle<()> {
        crate::metrics::record_inbound_line(&line.server);
        let span = spans::line(&line.server, &line.target, &line.nick);
        let this = self.clone();

        tokio::spawn(
            async move {
                let _permit = match &this.limiter {
                    Some(limiter) => match limiter.clone().acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return,
                    },
                    None => None,
                };
                this.run(client, Arc::new(line)).await;
            }
            .instrument(span),
        )
    }

    async fn run(&self, client: ClientHandle, line: Arc<InboundLine>) {
        let mut set: JoinSet<(&'static str, std::thread::Result<HandlerResult>)> = JoinSet::new();

        {
            let state = self.state.clone();
            let line = line.clone();
            spawn_guarded(&mut set, "links", async move {
                state.archive.save_from_line(&line).await?;
                Ok(())
            });
        }
        {
            let state = self.state.clone();
            let client = client.clone();
            let line = line.clone();
            spawn_guarded(&mut set, "spell", async move {
                spell_scan(&state, &client, &line).await
            });
        }
        {
            let state = self.state.clone();
            let registry = self.registry.clone();
            spawn_guarded(&mut set, "command", async move {
                registry.dispatch(&state, &client, &line).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(Ok(())))) => {}
                Ok((task, Ok(Err(e)))) => {
                    warn!(task, error = %e, "Fan-out task failed");
                    crate::metrics::record_fanout_failure(task, "error");
                }
                Ok((task, Err(_))) => {
                    error!(task, "Fan-out task panicked");
                    crate::metrics::record_fanout_failure(task, "panic");
                }
                // Only reachable if the runtime is shutting down.
                Err(e) => {
                    error!(error = %e, "Fan-out task aborted");
                    crate::metrics::record_fanout_failure("unknown", "aborted");
                }
            }
        }
    }
}

fn spawn_guarded<F>(
    set: &mut JoinSet<(&'static str, std::thread::Result<HandlerResult>)>,
    task: &'static str,
    fut: F,
) where
    F: std::future::Future<Output = HandlerResult> + Send + 'static,
{
    set.spawn(
        async move { (task, AssertUnwindSafe(fut).catch_unwind().await) }.in_current_span(),
    );
}

/// Reply to the first `word (sp?)` in the line with the checker's verdict.
async fn spell_scan(state: &BotState, client: &ClientHandle, line: &InboundLine) -> HandlerResult {
    let Some(word) = find_sp_word(&line.text) else {
        return Ok(());
    };
    let Some(reply_to) = line.reply_target() else {
        debug!(server = %line.server, "No reply target for spell check");
        return Ok(());
    };

    match state.speller.check(word).await {
        Ok(verdict) => {
            client.privmsg(reply_to, verdict.reply()).await?;
            Ok(())
        }
        Err(e) => {
            client.privmsg(reply_to, UNKNOWN_REPLY).await?;
            Err(HandlerError::from(e))
        }
    }
}
