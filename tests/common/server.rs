//! Fake IRC server.
//!
//! Accepts the bot's connections on an ephemeral port and lets a test play
//! the server side of each one line by line.

use std::time::Duration;

use scumbag_proto::{Command, Message};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

pub const SERVER_NAME: &str = "fake.server";

/// A listening fake server.
pub struct FakeIrcServer {
    listener: TcpListener,
}

impl FakeIrcServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// `host:port` to put in the bot's config.
    pub fn address(&self) -> String {
        self.listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default()
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<Peer> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(Peer {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            nick: String::new(),
        })
    }

    /// Accept and complete registration.
    pub async fn accept_registered(&self) -> anyhow::Result<Peer> {
        let mut peer = self.accept().await?;
        peer.register().await?;
        Ok(peer)
    }
}

/// The server side of one bot connection.
pub struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    /// Nick the bot registered with.
    pub nick: String,
}

#[allow(dead_code)]
impl Peer {
    /// Send a raw IRC line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single message from the bot.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive messages until the predicate matches; returns the match.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Message>
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok(msg);
            }
        }
    }

    /// Read NICK and USER, then welcome the bot.
    pub async fn register(&mut self) -> anyhow::Result<()> {
        loop {
            match self.recv().await?.command {
                Command::NICK(nick) => self.nick = nick,
                Command::USER(..) => break,
                _ => {}
            }
        }
        let welcome = format!(":{SERVER_NAME} 001 {} :Welcome to the fake network", self.nick);
        self.send_raw(&welcome).await
    }

    /// Wait for a JOIN of `channel`.
    pub async fn expect_join(&mut self, channel: &str) -> anyhow::Result<()> {
        self.recv_until(|m| matches!(&m.command, Command::JOIN(c) if c == channel))
            .await?;
        Ok(())
    }

    /// Deliver a PRIVMSG from `nick`.
    pub async fn privmsg_from(&mut self, nick: &str, target: &str, text: &str) -> anyhow::Result<()> {
        self.send_raw(&format!(":{nick}!{nick}@example.net PRIVMSG {target} :{text}"))
            .await
    }

    /// Next PRIVMSG the bot sends, as (target, text).
    pub async fn expect_privmsg(&mut self) -> anyhow::Result<(String, String)> {
        let msg = self
            .recv_until(|m| matches!(m.command, Command::PRIVMSG(..)))
            .await?;
        match msg.command {
            Command::PRIVMSG(target, text) => Ok((target, text)),
            _ => unreachable!(),
        }
    }

    /// Assert the bot sends no PRIVMSG within `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            match self.recv_timeout(left).await {
                Ok(msg) if matches!(msg.command, Command::PRIVMSG(..)) => {
                    anyhow::bail!("unexpected reply: {msg}")
                }
                Ok(_) => {}
                Err(_) => return Ok(()),
            }
        }
    }

    /// Wait for QUIT, then hang up like a real server.
    pub async fn expect_quit(mut self) -> anyhow::Result<Option<String>> {
        let msg = self
            .recv_until(|m| matches!(m.command, Command::QUIT(_)))
            .await?;
        self.close().await;
        match msg.command {
            Command::QUIT(reason) => Ok(reason),
            _ => unreachable!(),
        }
    }

    /// Drop the connection.
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}
