//! IRC client connections.
//!
//! One [`connect`] call yields a [`ClientHandle`] for sending and a stream
//! of [`IrcEvent`]s produced by a background driver task.

mod client;
mod stream;
mod tls;

pub use client::{ClientHandle, ConnectOptions, IrcEvent, Outbound, connect};
pub use stream::IrcStream;

use thiserror::Error;

/// Connection-level errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls error: {0}")]
    Tls(String),
    #[error("line codec error: {0}")]
    Codec(#[from] scumbag_proto::ProtocolError),
    #[error("nick {0} rejected too many times")]
    NickRejected(String),
    #[error("connection closed")]
    Closed,
}
