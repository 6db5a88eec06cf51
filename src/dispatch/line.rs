//! Inbound message record.

use chrono::{DateTime, Utc};
use scumbag_proto::ChannelExt;

/// One PRIVMSG as received by a session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundLine {
    /// Originating server id (`host:port`).
    pub server: String,
    /// Channel, or our own nick for a private message.
    pub target: String,
    /// Sender nick.
    pub nick: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundLine {
    pub fn new(
        server: impl Into<String>,
        target: impl Into<String>,
        nick: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            target: target.into(),
            nick: nick.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    pub fn at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn is_private(&self) -> bool {
        !self.target.is_channel_name()
    }

    /// Where replies go: the channel, or the sender for a private message.
    ///
    /// `None` when the line carries no usable addressing.
    pub fn reply_target(&self) -> Option<&str> {
        if self.target.is_empty() {
            return None;
        }
        if !self.is_private() {
            return Some(&self.target);
        }
        (!self.nick.is_empty()).then_some(self.nick.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_lines_reply_to_channel() {
        let line = InboundLine::new("s:1", "#test", "bob", "hi");
        assert!(!line.is_private());
        assert_eq!(line.reply_target(), Some("#test"));
    }

    #[test]
    fn private_lines_reply_to_sender() {
        let line = InboundLine::new("s:1", "scumbag", "bob", "hi");
        assert!(line.is_private());
        assert_eq!(line.reply_target(), Some("bob"));
    }

    #[test]
    fn no_addressing_means_no_reply() {
        assert_eq!(InboundLine::new("s:1", "", "bob", "hi").reply_target(), None);
        assert_eq!(InboundLine::new("s:1", "scumbag", "", "hi").reply_target(), None);
    }
}
