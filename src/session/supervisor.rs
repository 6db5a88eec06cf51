//! Startup, event pumps, wait and shutdown across all sessions.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use super::{Session, SessionStatus};
use crate::config::Config;
use crate::dispatch::{FanOut, InboundLine};
use crate::error::BotError;
use crate::network::{ClientHandle, IrcEvent};
use crate::telemetry::spans;

/// Owns every session and the process-wide shutdown flag.
pub struct Supervisor {
    sessions: DashMap<String, Arc<Session>>,
    fanout: FanOut,
    shutdown: CancellationToken,
    quit_message: Arc<str>,
}

impl Supervisor {
    pub fn new(config: &Config, fanout: FanOut) -> Self {
        let sessions = DashMap::new();
        for entry in &config.servers {
            sessions.insert(
                entry.server.clone(),
                Arc::new(Session::new(entry.clone(), config.bot.nick.clone())),
            );
        }

        Self {
            sessions,
            fanout,
            shutdown: CancellationToken::new(),
            quit_message: Arc::from(config.bot.quit_message.as_str()),
        }
    }

    pub fn session(&self, server: &str) -> Option<Arc<Session>> {
        self.sessions.get(server).map(|s| s.value().clone())
    }

    fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Connect every session concurrently.
    ///
    /// Returns how many connected; fails only when none did.
    pub async fn start_all(&self) -> Result<usize, BotError> {
        let sessions = self.all();
        let attempts = sessions.iter().map(|session| async move {
            let result = session.connect().await;
            (session.clone(), result)
        });

        let mut connected = 0;
        for (session, result) in join_all(attempts).await {
            match result {
                Ok((client, events)) => {
                    connected += 1;
                    self.spawn_pump(session, client, events);
                }
                Err(e) => {
                    error!(server = %session.server(), error = %e, "Failed to connect");
                }
            }
        }

        if connected == 0 {
            return Err(BotError::NoServersConnected);
        }
        info!(connected, total = sessions.len(), "Sessions started");
        Ok(connected)
    }

    /// Block until every session has terminated.
    pub async fn wait_all(&self) {
        join_all(self.all().iter().map(|s| s.wait())).await;
        debug!("All sessions terminated");
    }

    /// QUIT live sessions, terminate the rest, then close the store.
    pub async fn shutdown_all(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        info!("Shutting down all sessions");

        for session in self.all() {
            match session.client() {
                Some(client) if !client.is_closed() => {
                    debug!(server = %session.server(), "Sending QUIT");
                    if let Err(e) = client.quit(Some(self.quit_message.to_string())).await {
                        warn!(server = %session.server(), error = %e, "Failed to send QUIT");
                        session.terminate();
                    }
                }
                _ => session.terminate(),
            }
        }

        self.fanout.state().db.close().await;
        info!("Database closed");
    }

    fn spawn_pump(&self, session: Arc<Session>, client: ClientHandle, events: mpsc::Receiver<IrcEvent>) {
        let span = spans::session(session.server());
        let pump = Pump {
            session,
            fanout: self.fanout.clone(),
            shutdown: self.shutdown.clone(),
            quit_message: self.quit_message.clone(),
        };
        tokio::spawn(pump.run(client, events).instrument(span));
    }
}

/// Event loop for one session, across at most one reconnect per disconnect.
struct Pump {
    session: Arc<Session>,
    fanout: FanOut,
    shutdown: CancellationToken,
    quit_message: Arc<str>,
}

impl Pump {
    async fn run(self, mut client: ClientHandle, mut events: mpsc::Receiver<IrcEvent>) {
        loop {
            // Shutdown raced with the connect.
            if self.shutdown.is_cancelled() {
                let _ = client.quit(Some(self.quit_message.to_string())).await;
            }

            let reason = self.drive(&client, &mut events).await;
            drop(client);

            let reconnecting = self.session.entry().reconnect && !self.shutdown.is_cancelled();
            info!(reason = %reason, reconnecting, "Session disconnected");
            self.session.on_disconnect(reconnecting);
            if !reconnecting {
                return;
            }

            let delay = self.session.entry().reconnect_delay();
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    crate::metrics::record_reconnect("aborted");
                    self.session.set_status(SessionStatus::Disconnected);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.session.connect().await {
                Ok((new_client, new_events)) => {
                    info!("Reconnected");
                    crate::metrics::record_reconnect("success");
                    client = new_client;
                    events = new_events;
                }
                Err(e) => {
                    error!(error = %e, "Reconnect failed, giving up");
                    crate::metrics::record_reconnect("failure");
                    return;
                }
            }
        }
    }

    /// Handle events until the connection ends; returns the reason.
    async fn drive(&self, client: &ClientHandle, events: &mut mpsc::Receiver<IrcEvent>) -> String {
        while let Some(event) = events.recv().await {
            match event {
                IrcEvent::Connected { nick } => {
                    info!(nick = %nick, "Connected");
                    self.session.mark_connected();
                    for channel in &self.session.entry().channels {
                        if let Err(e) = client.join(channel).await {
                            warn!(channel = %channel, error = %e, "Failed to join");
                        }
                    }
                }
                IrcEvent::Privmsg {
                    nick,
                    target,
                    text,
                    received_at,
                } => {
                    let line = InboundLine::new(self.session.server(), target, nick, text)
                        .at(received_at);
                    self.fanout.dispatch(client.clone(), line);
                }
                IrcEvent::Disconnected { reason } => return reason,
            }
        }
        "event stream closed".to_string()
    }
}
