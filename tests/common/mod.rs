//! Integration test common infrastructure.
//!
//! Provides a fake IRC server that the bot connects to, plus helpers for
//! building a bot wired to it.

pub mod server;

#[allow(unused_imports)]
pub use server::{FakeIrcServer, Peer};

use std::sync::Arc;

use scumbag::config::Config;
use scumbag::db::Database;
use scumbag::dispatch::FanOut;
use scumbag::handlers::Registry;
use scumbag::session::Supervisor;
use scumbag::state::BotState;

/// A running bot and its shared state.
#[allow(dead_code)]
pub struct TestBot {
    pub state: Arc<BotState>,
    pub supervisor: Arc<Supervisor>,
}

/// One `[[servers]]` entry for `config`.
#[allow(dead_code)]
pub fn server_entry(address: &str, channels: &[&str], reconnect: bool) -> String {
    let channels = channels
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "[[servers]]\nserver = \"{address}\"\nchannels = [{channels}]\nreconnect = {reconnect}\nreconnect_delay_secs = 0\n"
    )
}

/// Config with an in-memory database, `alice` as admin, and `servers` appended.
pub fn config(servers: &[String]) -> Config {
    let mut toml = String::from(
        "[bot]\nnick = \"scumbag\"\nadmins = [\"alice\"]\n\n[database]\npath = \":memory:\"\n\n",
    );
    for entry in servers {
        toml.push_str(entry);
        toml.push('\n');
    }
    toml::from_str(&toml).expect("test config")
}

impl TestBot {
    pub async fn new(config: Config) -> Self {
        let db = Database::new(&config.database.path)
            .await
            .expect("in-memory database");
        let state = Arc::new(BotState::new(config.clone(), db));
        let fanout = FanOut::new(state.clone(), Arc::new(Registry::new()));
        let supervisor = Arc::new(Supervisor::new(&config, fanout));
        Self { state, supervisor }
    }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr.to_string()
}
