//! Link repository for the URL archive.

use crate::db::DbError;
use futures_util::TryStreamExt;
use sqlx::SqlitePool;

/// Maximum rows returned by a link search.
pub const SEARCH_LIMIT: i64 = 5;

/// A saved URL occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub nick: String,
    pub url: String,
    pub server: String,
    pub channel: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

type LinkRow = (i64, String, String, String, String, i64);

impl From<LinkRow> for Link {
    fn from((id, nick, url, server, channel, created_at): LinkRow) -> Self {
        Self {
            id,
            nick,
            url,
            server,
            channel,
            created_at,
        }
    }
}

/// Result of [`LinkRepository::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInsert {
    /// A new row with this id.
    New(i64),
    /// The (url, server, channel) triple was already archived.
    Existing,
}

/// Repository for link operations.
pub struct LinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkRepository<'a> {
    /// Create a new link repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether this url is already archived for (server, channel).
    pub async fn exists(&self, url: &str, server: &str, channel: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM links
            WHERE url = ? AND server = ? AND channel = ?
            LIMIT 1
            "#,
        )
        .bind(url)
        .bind(server)
        .bind(channel)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Insert a link. A unique violation on (url, server, channel) is reported
    /// as [`LinkInsert::Existing`] rather than an error.
    pub async fn insert(
        &self,
        nick: &str,
        url: &str,
        server: &str,
        channel: &str,
        created_at: i64,
    ) -> Result<LinkInsert, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (nick, url, server, channel, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(nick)
        .bind(url)
        .bind(server)
        .bind(channel)
        .bind(created_at)
        .execute(self.pool)
        .await;

        match result {
            Ok(done) => Ok(LinkInsert::New(done.last_insert_rowid())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(LinkInsert::Existing),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent links posted by `nick` in (server, channel).
    pub async fn by_nick(
        &self,
        nick: &str,
        server: &str,
        channel: &str,
    ) -> Result<Vec<Link>, DbError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, nick, url, server, channel, created_at
            FROM links
            WHERE nick = ? AND server = ? AND channel = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(nick)
        .bind(server)
        .bind(channel)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    /// Most recent links in (server, channel) whose url contains `pattern`,
    /// ignoring case. The pattern is a plain substring.
    ///
    /// SQLite's `LIKE` and `lower()` only fold ASCII, so rows are streamed
    /// newest first and compared after Unicode lowercasing.
    pub async fn matching_url(
        &self,
        pattern: &str,
        server: &str,
        channel: &str,
    ) -> Result<Vec<Link>, DbError> {
        let needle = pattern.to_lowercase();

        let mut rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, nick, url, server, channel, created_at
            FROM links
            WHERE server = ? AND channel = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(server)
        .bind(channel)
        .fetch(self.pool);

        let mut found = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let link = Link::from(row);
            if !link.url.to_lowercase().contains(&needle) {
                continue;
            }
            found.push(link);
            if found.len() >= SEARCH_LIMIT as usize {
                break;
            }
        }

        Ok(found)
    }

    /// Total archived links.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
