//! Session supervisor.
//!
//! One [`Session`] per configured server. The [`Supervisor`] connects them
//! all, runs an event pump per live connection, and provides the
//! process-level wait and shutdown gates.

mod supervisor;

pub use supervisor::Supervisor;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ServerEntry;
use crate::network::{self, ClientHandle, ConnectOptions, IrcEvent, NetworkError};

/// Connection state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    /// Connecting, registering, or waiting out a reconnect delay.
    Connecting,
    /// Welcomed by the server.
    Connected,
}

/// One configured server.
///
/// The liveness token fires when the connection ends for good or is about
/// to be replaced; a successful reconnect installs a fresh one. Only the
/// session's own event pump replaces it.
pub struct Session {
    entry: ServerEntry,
    default_nick: String,
    status: watch::Sender<SessionStatus>,
    liveness: Mutex<CancellationToken>,
    client: Mutex<Option<ClientHandle>>,
}

impl Session {
    pub fn new(entry: ServerEntry, default_nick: impl Into<String>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Disconnected);
        Self {
            entry,
            default_nick: default_nick.into(),
            status,
            liveness: Mutex::new(CancellationToken::new()),
            client: Mutex::new(None),
        }
    }

    /// Server id (`host:port`).
    pub fn server(&self) -> &str {
        &self.entry.server
    }

    pub fn entry(&self) -> &ServerEntry {
        &self.entry
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// The current liveness token.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.lock().clone()
    }

    /// Handle of the live connection, if any.
    pub fn client(&self) -> Option<ClientHandle> {
        self.client.lock().clone()
    }

    /// Open a connection.
    ///
    /// On success the session holds the new handle and, if the previous
    /// liveness token already fired, a fresh one.
    pub async fn connect(&self) -> Result<(ClientHandle, mpsc::Receiver<IrcEvent>), NetworkError> {
        self.status.send_replace(SessionStatus::Connecting);

        let result = match ConnectOptions::from_entry(&self.entry, &self.default_nick) {
            Ok(opts) => network::connect(&opts).await,
            Err(e) => Err(e),
        };

        match result {
            Ok((client, events)) => {
                {
                    let mut liveness = self.liveness.lock();
                    if liveness.is_cancelled() {
                        *liveness = CancellationToken::new();
                    }
                }
                *self.client.lock() = Some(client.clone());
                Ok((client, events))
            }
            Err(e) => {
                self.status.send_replace(SessionStatus::Disconnected);
                Err(e)
            }
        }
    }

    /// The server welcomed us.
    pub(crate) fn mark_connected(&self) {
        if self.status.send_replace(SessionStatus::Connected) != SessionStatus::Connected {
            crate::metrics::inc_connected_sessions();
        }
    }

    /// The connection ended. Fires the liveness token (idempotent).
    ///
    /// With `reconnecting` the status stays `Connecting`, so waiters keep
    /// blocking until the reconnect settles.
    pub(crate) fn on_disconnect(&self, reconnecting: bool) {
        let next = if reconnecting {
            SessionStatus::Connecting
        } else {
            SessionStatus::Disconnected
        };
        self.set_status(next);
        self.client.lock().take();
        self.liveness.lock().cancel();
    }

    /// Force a final `Disconnected` and fire the liveness token.
    pub(crate) fn terminate(&self) {
        debug!(server = %self.server(), "Terminating session");
        self.on_disconnect(false);
    }

    pub(crate) fn set_status(&self, next: SessionStatus) {
        if self.status.send_replace(next) == SessionStatus::Connected && next != SessionStatus::Connected {
            crate::metrics::dec_connected_sessions();
        }
    }

    /// Block until the liveness token has fired and no reconnect replaced it.
    pub async fn wait(&self) {
        let mut status = self.status.subscribe();
        loop {
            self.liveness().cancelled().await;

            // A reconnect may be in flight.
            if status
                .wait_for(|s| *s != SessionStatus::Connecting)
                .await
                .is_err()
            {
                return;
            }
            if self.liveness().is_cancelled() {
                return;
            }
        }
    }
}
