//! Link archive: URL extraction, deduplicated storage and search.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::db::{Database, DbError, Link, LinkInsert};
use crate::dispatch::InboundLine;

/// ftp/git/http/https URLs with optional userinfo, port and path.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:ftp|git|http|https)://(?:\w+:?\w*@)?\S+(?::[0-9]+)?(?:/|/[\w#!:.?+=&%@\-/])?")
        .expect("URL regex creation failed")
});

/// What happened to one extracted URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    New,
    Existing,
    Ignored,
}

impl LinkOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkOutcome::New => "new",
            LinkOutcome::Existing => "existing",
            LinkOutcome::Ignored => "ignored",
        }
    }
}

/// A parsed `url` search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkQuery {
    /// Exact nick match.
    Nick(String),
    /// Case-insensitive substring of the url, from `/pattern/`.
    Pattern(String),
}

impl LinkQuery {
    /// `None` for an empty query or an empty `//` pattern.
    pub fn parse(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if query.len() >= 2 && query.starts_with('/') && query.ends_with('/') {
            let pattern = &query[1..query.len() - 1];
            return (!pattern.is_empty()).then(|| LinkQuery::Pattern(pattern.to_string()));
        }
        Some(LinkQuery::Nick(query.to_string()))
    }
}

/// Every distinct URL in `text`, in order of first appearance.
pub fn extract_urls(text: &str) -> Vec<&str> {
    let mut urls: Vec<&str> = Vec::new();
    for m in URL_REGEX.find_iter(text) {
        if !urls.contains(&m.as_str()) {
            urls.push(m.as_str());
        }
    }
    urls
}

/// Deduplicated link store scoped by (server, channel).
#[derive(Clone)]
pub struct LinkArchive {
    db: Database,
}

impl LinkArchive {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Archive every URL in `line`.
    ///
    /// The ignore list is only consulted when the line has URLs. Each URL is
    /// checked for an existing row before inserting; a unique violation on
    /// insert counts as existing.
    pub async fn save_from_line(
        &self,
        line: &InboundLine,
    ) -> Result<Vec<(String, LinkOutcome)>, DbError> {
        let urls = extract_urls(&line.text);
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        if self.db.ignores().is_ignored(&line.server, &line.nick).await? {
            debug!(server = %line.server, nick = %line.nick, "Ignored nick, not saving links");
            for _ in &urls {
                crate::metrics::record_link(LinkOutcome::Ignored.as_str());
            }
            return Ok(urls
                .into_iter()
                .map(|u| (u.to_string(), LinkOutcome::Ignored))
                .collect());
        }

        let links = self.db.links();
        let created_at = line.received_at.timestamp();
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            let outcome = if links.exists(url, &line.server, &line.target).await? {
                LinkOutcome::Existing
            } else {
                match links
                    .insert(&line.nick, url, &line.server, &line.target, created_at)
                    .await?
                {
                    LinkInsert::New(_) => LinkOutcome::New,
                    LinkInsert::Existing => LinkOutcome::Existing,
                }
            };

            match outcome {
                LinkOutcome::New => {
                    info!(url = %url, server = %line.server, channel = %line.target, nick = %line.nick, "new link")
                }
                _ => info!(url = %url, server = %line.server, channel = %line.target, "existing link"),
            }
            crate::metrics::record_link(outcome.as_str());
            outcomes.push((url.to_string(), outcome));
        }

        Ok(outcomes)
    }

    /// Up to five links for `query` in (server, channel), newest first.
    pub async fn search(
        &self,
        query: &LinkQuery,
        server: &str,
        channel: &str,
    ) -> Result<Vec<Link>, DbError> {
        let links = self.db.links();
        match query {
            LinkQuery::Nick(nick) => links.by_nick(nick, server, channel).await,
            LinkQuery::Pattern(pattern) => links.matching_url(pattern, server, channel).await,
        }
    }
}
