//! # scumbag-proto
//!
//! The slice of the IRC protocol a client bot needs: parsing server lines
//! into [`Message`] values and serializing the commands the bot sends.
//!
//! ```rust
//! use scumbag_proto::{Command, Message};
//!
//! let msg: Message = ":bob!b@example.org PRIVMSG #test :hi there".parse().unwrap();
//! assert_eq!(msg.source_nickname(), Some("bob"));
//! assert!(matches!(msg.command, Command::PRIVMSG(ref t, _) if t == "#test"));
//!
//! assert_eq!(Message::privmsg("#test", "hello").to_string(), "PRIVMSG #test :hello");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chan;
pub mod command;
pub mod error;
pub mod line;
pub mod message;
pub mod prefix;
pub mod response;

pub use chan::ChannelExt;
pub use command::Command;
pub use error::{MessageParseError, ProtocolError};
pub use line::LineCodec;
pub use message::Message;
pub use prefix::Prefix;
pub use response::Response;
