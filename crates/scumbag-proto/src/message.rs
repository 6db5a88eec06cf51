//! Whole IRC lines.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// A single IRC message: optional prefix plus a command.
///
/// IRCv3 tags are accepted on input and discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message origin, if the server supplied one.
    pub prefix: Option<Prefix>,
    /// The command and its parameters.
    pub command: Command,
}

impl Message {
    /// `PRIVMSG target :text`
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// `JOIN channel`
    pub fn join(channel: impl Into<String>) -> Self {
        Command::JOIN(channel.into()).into()
    }

    /// `NICK nick`
    pub fn nick(nick: impl Into<String>) -> Self {
        Command::NICK(nick.into()).into()
    }

    /// `PONG token`
    pub fn pong(token: impl Into<String>) -> Self {
        Command::PONG(token.into()).into()
    }

    /// `QUIT [:message]`
    pub fn quit(message: Option<String>) -> Self {
        Command::QUIT(message).into()
    }

    /// Nickname of the sender, when the prefix is a user mask.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }
}

fn parse_line(line: &str) -> Result<Message, MessageParseError> {
    let mut rest = line.trim_end_matches(['\r', '\n']);

    if let Some(tagged) = rest.strip_prefix('@') {
        rest = tagged.split_once(' ').map(|(_, r)| r).unwrap_or("");
    }
    rest = rest.trim_start_matches(' ');

    if rest.is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let prefix = match rest.strip_prefix(':') {
        Some(p) => {
            let (raw, after) = p.split_once(' ').unwrap_or((p, ""));
            rest = after.trim_start_matches(' ');
            Some(Prefix::new_from_str(raw))
        }
        None => None,
    };

    let (name, mut params) = rest.split_once(' ').unwrap_or((rest, ""));
    if name.is_empty() {
        return Err(MessageParseError::MissingCommand);
    }

    let mut args = Vec::new();
    loop {
        params = params.trim_start_matches(' ');
        if params.is_empty() {
            break;
        }
        if let Some(trailing) = params.strip_prefix(':') {
            args.push(trailing.to_string());
            break;
        }
        let (arg, next) = params.split_once(' ').unwrap_or((params, ""));
        args.push(arg.to_string());
        params = next;
    }

    Ok(Message {
        prefix,
        command: Command::new(name, args)?,
    })
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_string(),
            cause,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)
    }
}
