//! Ignored-nick repository.

use crate::db::DbError;
use sqlx::SqlitePool;

/// Repository for (server, nick) pairs whose links are never archived.
pub struct IgnoreRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IgnoreRepository<'a> {
    /// Create a new ignore repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn is_ignored(&self, server: &str, nick: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM ignored_nicks
            WHERE server = ? AND nick = ?
            LIMIT 1
            "#,
        )
        .bind(server)
        .bind(nick)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Add an ignore. Returns false if the pair was already ignored.
    pub async fn ignore(&self, server: &str, nick: &str) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO ignored_nicks (server, nick, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(server)
        .bind(nick)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove an ignore. Returns false if the pair was not ignored.
    pub async fn unignore(&self, server: &str, nick: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            DELETE FROM ignored_nicks
            WHERE server = ? AND nick = ?
            "#,
        )
        .bind(server)
        .bind(nick)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Ignored nicks on `server`, alphabetically.
    pub async fn list(&self, server: &str) -> Result<Vec<String>, DbError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT nick FROM ignored_nicks
            WHERE server = ?
            ORDER BY nick
            "#,
        )
        .bind(server)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(nick,)| nick).collect())
    }
}
