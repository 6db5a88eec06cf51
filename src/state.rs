//! Process-wide state shared by every session and handler.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::archive::LinkArchive;
use crate::config::Config;
use crate::db::Database;
use crate::spell::{Aspell, SpellChecker};

const USER_AGENT: &str = concat!("scumbag/", env!("CARGO_PKG_VERSION"));

pub const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
pub const URBAN_DICTIONARY_API: &str = "https://api.urbandictionary.com/v0";

/// Base URLs for the lookup commands.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub wikipedia: String,
    pub urban_dictionary: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            wikipedia: WIKIPEDIA_API.to_string(),
            urban_dictionary: URBAN_DICTIONARY_API.to_string(),
        }
    }
}

/// Immutable after startup; shared through `Arc`.
pub struct BotState {
    pub config: Config,
    pub db: Database,
    pub archive: LinkArchive,
    pub http: reqwest::Client,
    pub speller: Arc<dyn SpellChecker>,
    pub endpoints: Endpoints,
    pub started_at: Instant,
    admins: HashSet<String>,
}

impl BotState {
    pub fn new(config: Config, db: Database) -> Self {
        let timeout = config.dispatch.http_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let speller = Arc::new(Aspell::new(config.tools.aspell.clone(), timeout));
        let admins = config.bot.admins.iter().cloned().collect();

        Self {
            archive: LinkArchive::new(db.clone()),
            config,
            db,
            http,
            speller,
            endpoints: Endpoints::default(),
            started_at: Instant::now(),
            admins,
        }
    }

    pub fn with_spell_checker(mut self, speller: Arc<dyn SpellChecker>) -> Self {
        self.speller = speller;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        self.admins.contains(nick)
    }

    pub fn prefix(&self) -> char {
        self.config.bot.prefix
    }

    /// Bound applied to outbound HTTP calls and helper processes.
    pub fn http_timeout(&self) -> Duration {
        self.config.dispatch.http_timeout()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
