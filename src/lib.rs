//! scumbag - a multi-server IRC bot.
//!
//! Keeps one session per configured server, fans every channel line out to
//! a link archive, a `(sp?)` spell scanner and a command router, and
//! answers from a small fixed command set.

pub mod archive;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod session;
pub mod spell;
pub mod state;
pub mod telemetry;
