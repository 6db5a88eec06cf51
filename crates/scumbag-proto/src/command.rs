//! IRC commands sent and understood by the bot.

use std::fmt;

use crate::error::MessageParseError;
use crate::response::Response;

/// A parsed or outgoing IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Command {
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode * :realname`
    USER(String, String, String),
    /// `PASS password`
    PASS(String),
    /// `PING token`
    PING(String),
    /// `PONG token`
    PONG(String),
    /// `JOIN channel`
    JOIN(String),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `NOTICE target :text`
    NOTICE(String, String),
    /// `QUIT [:message]`
    QUIT(Option<String>),
    /// `ERROR :message`
    ERROR(String),
    /// A numeric reply with its parameters.
    Response(Response, Vec<String>),
    /// Anything else, kept verbatim.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its name and already-split parameters.
    pub fn new(name: &str, mut args: Vec<String>) -> Result<Command, MessageParseError> {
        if name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit()) {
            let code: u16 = name
                .parse()
                .map_err(|_| MessageParseError::InvalidNumeric(name.to_string()))?;
            return Ok(Command::Response(Response(code), args));
        }

        let upper = name.to_ascii_uppercase();
        let need = |n: usize, have: usize| {
            if have < n {
                Err(MessageParseError::NotEnoughArguments {
                    command: name.to_ascii_uppercase(),
                })
            } else {
                Ok(())
            }
        };

        let cmd = match upper.as_str() {
            "NICK" => {
                need(1, args.len())?;
                Command::NICK(args.swap_remove(0))
            }
            "USER" => {
                need(4, args.len())?;
                let realname = args.swap_remove(3);
                let mode = args.swap_remove(1);
                Command::USER(args.swap_remove(0), mode, realname)
            }
            "PASS" => {
                need(1, args.len())?;
                Command::PASS(args.swap_remove(0))
            }
            "PING" => Command::PING(args.into_iter().next().unwrap_or_default()),
            "PONG" => Command::PONG(args.into_iter().next().unwrap_or_default()),
            "JOIN" => {
                need(1, args.len())?;
                Command::JOIN(args.swap_remove(0))
            }
            "PRIVMSG" | "NOTICE" => {
                need(2, args.len())?;
                let mut it = args.into_iter();
                let target = it.next().unwrap_or_default();
                let text = it.next().unwrap_or_default();
                if upper == "PRIVMSG" {
                    Command::PRIVMSG(target, text)
                } else {
                    Command::NOTICE(target, text)
                }
            }
            "QUIT" => Command::QUIT(args.into_iter().next()),
            "ERROR" => Command::ERROR(args.into_iter().next().unwrap_or_default()),
            _ => Command::Raw(upper, args),
        };
        Ok(cmd)
    }
}

/// Writes `args` with the last one as a trailing parameter when needed.
fn write_params(f: &mut fmt::Formatter<'_>, args: &[String]) -> fmt::Result {
    let Some((last, init)) = args.split_last() else {
        return Ok(());
    };
    for arg in init {
        write!(f, " {arg}")?;
    }
    if last.is_empty() || last.contains(' ') || last.starts_with(':') {
        write!(f, " :{last}")
    } else {
        write!(f, " {last}")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::NICK(nick) => write!(f, "NICK {nick}"),
            Command::USER(user, mode, realname) => write!(f, "USER {user} {mode} * :{realname}"),
            Command::PASS(pass) => write!(f, "PASS {pass}"),
            Command::PING(token) => write!(f, "PING :{token}"),
            Command::PONG(token) => write!(f, "PONG :{token}"),
            Command::JOIN(chan) => write!(f, "JOIN {chan}"),
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {target} :{text}"),
            Command::NOTICE(target, text) => write!(f, "NOTICE {target} :{text}"),
            Command::QUIT(Some(msg)) => write!(f, "QUIT :{msg}"),
            Command::QUIT(None) => f.write_str("QUIT"),
            Command::ERROR(msg) => write!(f, "ERROR :{msg}"),
            Command::Response(resp, args) => {
                write!(f, "{resp}")?;
                write_params(f, args)
            }
            Command::Raw(name, args) => {
                f.write_str(name)?;
                write_params(f, args)
            }
        }
    }
}
