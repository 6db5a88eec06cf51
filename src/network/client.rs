//! Connection setup and the per-connection driver task.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use scumbag_proto::{Command, LineCodec, Message, Response};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, info_span, warn};

use super::NetworkError;
use super::stream::IrcStream;
use super::tls::upgrade_to_tls;
use crate::config::ServerEntry;

/// Longest line accepted from a server; longer ones are skipped.
const MAX_LINE_LENGTH: usize = 8192;

/// Lines that may be written back-to-back before throttling starts.
pub const FLOOD_BURST: u32 = 5;

/// Steady-state spacing between outbound lines once the burst is spent.
pub const FLOOD_INTERVAL: Duration = Duration::from_secs(1);

/// Nick rejections tolerated before registration is abandoned.
const MAX_NICK_RETRIES: u32 = 5;

/// Time allowed for the server to close the socket after our QUIT.
const QUIT_GRACE: Duration = Duration::from_secs(3);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

const OUTBOUND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 256;

/// Everything needed to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// `host:port`, used in logs and events.
    pub server: String,
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub password: Option<String>,
    pub ssl: bool,
    pub verify_cert: bool,
    pub connect_timeout: Duration,
    /// Outbound lines allowed without delay.
    pub flood_burst: u32,
    /// Spacing between outbound lines after the burst.
    pub flood_interval: Duration,
}

impl ConnectOptions {
    /// Build options for a configured server, falling back to `default_nick`.
    pub fn from_entry(entry: &ServerEntry, default_nick: &str) -> Result<Self, NetworkError> {
        let (host, port) = entry
            .host_port()
            .ok_or_else(|| NetworkError::InvalidAddress(entry.server.clone()))?;

        Ok(Self {
            server: entry.server.clone(),
            host: host.to_string(),
            port,
            nick: entry.nick.clone().unwrap_or_else(|| default_nick.to_string()),
            password: entry.password.clone(),
            ssl: entry.ssl,
            verify_cert: entry.verify_cert,
            connect_timeout: CONNECT_TIMEOUT,
            flood_burst: FLOOD_BURST,
            flood_interval: FLOOD_INTERVAL,
        })
    }

    /// Token bucket applied to queued outbound messages.
    fn flood_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.flood_burst).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(self.flood_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}

/// Events emitted by a connection's driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// The server sent its welcome (001); `nick` is the nick it accepted.
    Connected { nick: String },
    /// A PRIVMSG from a user.
    Privmsg {
        nick: String,
        target: String,
        text: String,
        received_at: DateTime<Utc>,
    },
    /// The connection ended. Emitted exactly once, always last.
    Disconnected { reason: String },
}

/// Work queued for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(Message),
    /// Send QUIT, then wait briefly for the server to hang up.
    Quit(Option<String>),
}

/// Cloneable sender half of a connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    server: Arc<str>,
    tx: mpsc::Sender<Outbound>,
}

impl ClientHandle {
    /// A handle whose outbound queue is returned to the caller instead of a socket.
    pub fn detached(server: &str, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                server: Arc::from(server),
                tx,
            },
            rx,
        )
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// True once the driver has stopped reading the outbound queue.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn send(&self, message: Message) -> Result<(), NetworkError> {
        self.tx
            .send(Outbound::Message(message))
            .await
            .map_err(|_| NetworkError::Closed)
    }

    /// Line breaks in `text` become spaces so one reply is one line.
    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), NetworkError> {
        let text = text.replace(['\r', '\n'], " ");
        self.send(Message::privmsg(target, text)).await
    }

    pub async fn join(&self, channel: &str) -> Result<(), NetworkError> {
        self.send(Message::join(channel)).await
    }

    pub async fn nick(&self, nick: &str) -> Result<(), NetworkError> {
        self.send(Message::nick(nick)).await
    }

    pub async fn quit(&self, reason: Option<String>) -> Result<(), NetworkError> {
        self.tx
            .send(Outbound::Quit(reason))
            .await
            .map_err(|_| NetworkError::Closed)
    }
}

/// Open a connection, register, and spawn its driver.
///
/// Returns once registration has been written; [`IrcEvent::Connected`]
/// follows when the server welcomes us.
pub async fn connect(
    opts: &ConnectOptions,
) -> Result<(ClientHandle, mpsc::Receiver<IrcEvent>), NetworkError> {
    info!(server = %opts.server, tls = opts.ssl, "Connecting");

    let tcp_stream = tokio::time::timeout(
        opts.connect_timeout,
        TcpStream::connect((opts.host.as_str(), opts.port)),
    )
    .await
    .map_err(|_| NetworkError::ConnectTimeout(opts.server.clone()))??;

    let stream = if opts.ssl {
        IrcStream::Tls(Box::new(
            upgrade_to_tls(tcp_stream, &opts.host, opts.verify_cert).await?,
        ))
    } else {
        IrcStream::Plain(tcp_stream)
    };

    let mut framed = Framed::new(stream, LineCodec::with_max_len(MAX_LINE_LENGTH));

    if let Some(pass) = &opts.password {
        send_message(&mut framed, &Command::PASS(pass.clone()).into()).await?;
    }
    send_message(&mut framed, &Message::nick(&opts.nick)).await?;
    send_message(
        &mut framed,
        &Command::USER(opts.nick.clone(), "0".to_string(), opts.nick.clone()).into(),
    )
    .await?;

    let (handle, outbound_rx) = ClientHandle::detached(&opts.server, OUTBOUND_CAPACITY);
    let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);

    let driver = Driver {
        framed,
        outbound: outbound_rx,
        events: events_tx,
        limiter: RateLimiter::direct(opts.flood_quota()),
        nick: opts.nick.clone(),
        nick_retries: 0,
        registered: false,
    };
    let span = info_span!("irc", server = %opts.server);
    tokio::spawn(driver.run().instrument(span));

    Ok((handle, events_rx))
}

async fn send_message(
    framed: &mut Framed<IrcStream, LineCodec>,
    message: &Message,
) -> Result<(), NetworkError> {
    framed.send(message.to_string()).await?;
    Ok(())
}

struct Driver {
    framed: Framed<IrcStream, LineCodec>,
    outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<IrcEvent>,
    /// Paces queued messages. PONG and QUIT are not counted.
    limiter: DefaultDirectRateLimiter,
    nick: String,
    nick_retries: u32,
    registered: bool,
}

impl Driver {
    async fn run(mut self) {
        // A dequeued message waiting for the limiter. The queue is not read
        // while one is held, so order is kept and QUIT goes out last.
        let mut held: Option<Message> = None;

        let reason = loop {
            tokio::select! {
                _ = self.limiter.until_ready(), if held.is_some() => {
                    if let Some(msg) = held.take()
                        && let Err(e) = send_message(&mut self.framed, &msg).await
                    {
                        break format!("write failed: {e}");
                    }
                }
                out = self.outbound.recv(), if held.is_none() => match out {
                    Some(Outbound::Message(msg)) => held = Some(msg),
                    Some(Outbound::Quit(reason)) => {
                        if let Err(e) = send_message(&mut self.framed, &Message::quit(reason)).await {
                            break format!("write failed: {e}");
                        }
                        self.drain_until_closed().await;
                        break "quit".to_string();
                    }
                    None => break "client handle dropped".to_string(),
                },
                line = self.framed.next() => match line {
                    Some(Ok(line)) => match self.handle_line(&line).await {
                        Ok(()) => {}
                        Err(e @ NetworkError::NickRejected(_)) => break e.to_string(),
                        Err(e) => break format!("write failed: {e}"),
                    },
                    Some(Err(e)) => break format!("read failed: {e}"),
                    None => break "connection closed by server".to_string(),
                },
            }
        };

        info!(reason = %reason, "Disconnected");
        let _ = self.events.send(IrcEvent::Disconnected { reason }).await;
    }

    /// Read and discard until the server closes the socket or the grace period ends.
    async fn drain_until_closed(&mut self) {
        let drain = async { while let Some(Ok(_)) = self.framed.next().await {} };
        if tokio::time::timeout(QUIT_GRACE, drain).await.is_err() {
            debug!("Server did not close after QUIT");
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<(), NetworkError> {
        let msg = match line.parse::<Message>() {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to parse inbound message: {}", e);
                return Ok(());
            }
        };

        match msg.command {
            Command::PING(ref token) => {
                send_message(&mut self.framed, &Message::pong(token.clone())).await?;
            }
            Command::Response(Response::RPL_WELCOME, ref args) => {
                if let Some(accepted) = args.first() {
                    self.nick = accepted.clone();
                }
                self.registered = true;
                info!(nick = %self.nick, "Registered");
                self.emit(IrcEvent::Connected {
                    nick: self.nick.clone(),
                })
                .await;
            }
            Command::Response(resp, _) if resp.is_nick_rejection() && !self.registered => {
                if self.nick_retries >= MAX_NICK_RETRIES {
                    warn!(code = %resp, nick = %self.nick, "Nick rejected, giving up");
                    return Err(NetworkError::NickRejected(self.nick.clone()));
                }
                self.nick_retries += 1;
                self.nick.push('_');
                warn!(code = %resp, nick = %self.nick, "Nick rejected, retrying");
                send_message(&mut self.framed, &Message::nick(self.nick.clone())).await?;
            }
            Command::NICK(ref new_nick) if msg.source_nickname() == Some(self.nick.as_str()) => {
                info!(old = %self.nick, new = %new_nick, "Nick changed");
                self.nick = new_nick.clone();
            }
            Command::PRIVMSG(ref target, ref text) => {
                let Some(nick) = msg.source_nickname() else {
                    debug!(target = %target, "PRIVMSG without a user prefix");
                    return Ok(());
                };
                self.emit(IrcEvent::Privmsg {
                    nick: nick.to_string(),
                    target: target.clone(),
                    text: text.clone(),
                    received_at: Utc::now(),
                })
                .await;
            }
            Command::ERROR(ref text) => {
                warn!(error = %text, "Server sent ERROR");
            }
            _ => {}
        }
        Ok(())
    }

    async fn emit(&self, event: IrcEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_util::codec::LinesCodec;

    async fn listener() -> (TcpListener, ConnectOptions) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let opts = ConnectOptions {
            server: format!("127.0.0.1:{port}"),
            host: "127.0.0.1".into(),
            port,
            nick: "scumbag".into(),
            password: Some("secret".into()),
            ssl: false,
            verify_cert: false,
            connect_timeout: Duration::from_secs(5),
            flood_burst: FLOOD_BURST,
            flood_interval: FLOOD_INTERVAL,
        };
        (listener, opts)
    }

    /// Accept the client and consume its PASS/NICK/USER.
    async fn registered(
        listener: &TcpListener,
        opts: &ConnectOptions,
    ) -> (
        ClientHandle,
        mpsc::Receiver<IrcEvent>,
        Framed<TcpStream, LinesCodec>,
    ) {
        let (client, accept) = tokio::join!(connect(opts), listener.accept());
        let (handle, events) = client.unwrap();
        let mut server = Framed::new(accept.unwrap().0, LinesCodec::new());
        for _ in 0..3 {
            recv_line(&mut server).await;
        }
        (handle, events, server)
    }

    async fn next_privmsg_text(events: &mut mpsc::Receiver<IrcEvent>) -> String {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Some(IrcEvent::Privmsg { text, .. })) => text,
            other => panic!("expected a privmsg, got {other:?}"),
        }
    }

    async fn recv_line(server: &mut Framed<TcpStream, LinesCodec>) -> String {
        server.next().await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn registers_and_reports_welcome() {
        let (listener, opts) = listener().await;
        let (client, accept) = tokio::join!(connect(&opts), listener.accept());
        let (_handle, mut events) = client.unwrap();
        let mut server = Framed::new(accept.unwrap().0, LinesCodec::new());

        assert_eq!(recv_line(&mut server).await, "PASS secret");
        assert_eq!(recv_line(&mut server).await, "NICK scumbag");
        assert_eq!(recv_line(&mut server).await, "USER scumbag 0 * :scumbag");

        server.send(":srv 001 scumbag :Welcome").await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(IrcEvent::Connected {
                nick: "scumbag".into()
            })
        );
    }

    #[tokio::test]
    async fn answers_ping_and_retries_nick() {
        let (listener, opts) = listener().await;
        let (client, accept) = tokio::join!(connect(&opts), listener.accept());
        let (_handle, mut events) = client.unwrap();
        let mut server = Framed::new(accept.unwrap().0, LinesCodec::new());
        for _ in 0..3 {
            recv_line(&mut server).await;
        }

        server.send("PING :abc").await.unwrap();
        assert_eq!(recv_line(&mut server).await, "PONG :abc");

        server
            .send(":srv 433 * scumbag :Nickname is already in use")
            .await
            .unwrap();
        assert_eq!(recv_line(&mut server).await, "NICK scumbag_");

        server.send(":srv 001 scumbag_ :Welcome").await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(IrcEvent::Connected {
                nick: "scumbag_".into()
            })
        );
    }

    #[tokio::test]
    async fn forwards_privmsg_and_reports_close_once() {
        let (listener, opts) = listener().await;
        let (client, accept) = tokio::join!(connect(&opts), listener.accept());
        let (handle, mut events) = client.unwrap();
        let mut server = Framed::new(accept.unwrap().0, LinesCodec::new());
        for _ in 0..3 {
            recv_line(&mut server).await;
        }

        server
            .send(":bob!b@h PRIVMSG #test :check http://example.com/x")
            .await
            .unwrap();
        match events.recv().await {
            Some(IrcEvent::Privmsg {
                nick, target, text, ..
            }) => {
                assert_eq!(nick, "bob");
                assert_eq!(target, "#test");
                assert_eq!(text, "check http://example.com/x");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle.privmsg("#test", "hi").await.unwrap();
        assert_eq!(recv_line(&mut server).await, "PRIVMSG #test :hi");

        drop(server);
        assert!(matches!(
            events.recv().await,
            Some(IrcEvent::Disconnected { .. })
        ));
        assert_eq!(events.recv().await, None);
        assert!(handle.privmsg("#test", "late").await.is_err());
    }

    #[tokio::test]
    async fn quit_waits_for_server_close() {
        let (listener, opts) = listener().await;
        let (client, accept) = tokio::join!(connect(&opts), listener.accept());
        let (handle, mut events) = client.unwrap();
        let mut server = Framed::new(accept.unwrap().0, LinesCodec::new());
        for _ in 0..3 {
            recv_line(&mut server).await;
        }

        handle.quit(Some("bye".into())).await.unwrap();
        assert_eq!(recv_line(&mut server).await, "QUIT :bye");
        drop(server);

        assert_eq!(
            events.recv().await,
            Some(IrcEvent::Disconnected {
                reason: "quit".into()
            })
        );
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let (listener, opts) = listener().await;
        drop(listener);
        assert!(connect(&opts).await.is_err());
    }

    #[tokio::test]
    async fn detached_handle_exposes_queue() {
        let (handle, mut rx) = ClientHandle::detached("irc.example.org:6667", 4);
        handle.join("#test").await.unwrap();
        handle.quit(None).await.unwrap();
        assert_eq!(rx.recv().await, Some(Outbound::Message(Message::join("#test"))));
        assert_eq!(rx.recv().await, Some(Outbound::Quit(None)));
        assert_eq!(handle.server(), "irc.example.org:6667");
    }

    #[tokio::test]
    async fn privmsg_stays_on_one_line() {
        let (handle, mut rx) = ClientHandle::detached("irc.example.org:6667", 4);
        handle.privmsg("#test", "a\r\nQUIT :pwned").await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(Outbound::Message(Message::privmsg("#test", "a  QUIT :pwned")))
        );
    }

    #[tokio::test]
    async fn non_utf8_line_does_not_disconnect() {
        let (listener, opts) = listener().await;
        let (_handle, mut events, mut server) = registered(&listener, &opts).await;

        server
            .get_mut()
            .write_all(b":bob!b@h PRIVMSG #test :caf\xe9\r\n")
            .await
            .unwrap();
        server
            .send(":bob!b@h PRIVMSG #test :see http://example.com/x")
            .await
            .unwrap();

        assert_eq!(next_privmsg_text(&mut events).await, "caf\u{FFFD}");
        assert_eq!(
            next_privmsg_text(&mut events).await,
            "see http://example.com/x"
        );
    }

    #[tokio::test]
    async fn overlong_line_is_skipped() {
        let (listener, opts) = listener().await;
        let (_handle, mut events, mut server) = registered(&listener, &opts).await;

        let long = format!(":bob!b@h PRIVMSG #test :{}", "a".repeat(MAX_LINE_LENGTH));
        server.send(long).await.unwrap();
        server.send(":bob!b@h PRIVMSG #test :short").await.unwrap();

        assert_eq!(next_privmsg_text(&mut events).await, "short");
    }

    #[tokio::test]
    async fn throttles_outbound_after_burst() {
        let (listener, mut opts) = listener().await;
        opts.flood_burst = 2;
        opts.flood_interval = Duration::from_millis(200);
        let (handle, _events, mut server) = registered(&listener, &opts).await;

        let started = Instant::now();
        for i in 0..6 {
            handle.privmsg("#test", &format!("line {i}")).await.unwrap();
        }
        for i in 0..6 {
            assert_eq!(recv_line(&mut server).await, format!("PRIVMSG #test :line {i}"));
        }

        // Two go out at once, the other four wait one interval each.
        assert!(
            started.elapsed() >= Duration::from_millis(700),
            "six lines arrived in {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn pong_is_not_queued_behind_throttled_lines() {
        let (listener, mut opts) = listener().await;
        opts.flood_burst = 1;
        opts.flood_interval = Duration::from_millis(500);
        let (handle, _events, mut server) = registered(&listener, &opts).await;

        for i in 0..5 {
            handle.privmsg("#test", &format!("line {i}")).await.unwrap();
        }
        assert_eq!(recv_line(&mut server).await, "PRIVMSG #test :line 0");

        server.send("PING :abc").await.unwrap();
        let mut before_pong = 0;
        loop {
            let line = recv_line(&mut server).await;
            if line == "PONG :abc" {
                break;
            }
            before_pong += 1;
        }
        assert!(before_pong < 4, "{before_pong} queued lines went out before PONG");
    }

    #[tokio::test]
    async fn gives_up_after_repeated_nick_rejection() {
        let (listener, opts) = listener().await;
        let (_handle, mut events, mut server) = registered(&listener, &opts).await;

        let mut expected = String::from("scumbag");
        for _ in 0..MAX_NICK_RETRIES {
            server
                .send(":srv 433 * x :Nickname is already in use")
                .await
                .unwrap();
            expected.push('_');
            assert_eq!(recv_line(&mut server).await, format!("NICK {expected}"));
        }

        server
            .send(":srv 433 * x :Nickname is already in use")
            .await
            .unwrap();
        match events.recv().await {
            Some(IrcEvent::Disconnected { reason }) => {
                assert!(reason.contains("rejected"), "reason: {reason}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events.recv().await, None);
    }
}
