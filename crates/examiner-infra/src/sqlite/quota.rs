//! SQLite quota repository.
//!
//! Implements `QuotaRepository` from `examiner-core` over the `users`
//! table. Quota is a whole number of seconds in `users.ai_quota`.

use chrono::Utc;
use sqlx::Row;

use examiner_core::repository::quota::QuotaRepository;
use examiner_types::error::RepositoryError;
use examiner_types::identity::{UserId, UserIdentity};

use super::format_datetime;
use super::pool::DatabasePool;

/// A user together with the interview time they have left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub identity: UserIdentity,
    pub quota_seconds: i64,
}

/// SQLite-backed implementation of `QuotaRepository`.
#[derive(Clone)]
pub struct SqliteQuotaRepository {
    pool: DatabasePool,
}

impl SqliteQuotaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Look up a user and their quota.
    pub async fn find(&self, user_id: UserId) -> Result<Option<QuotaRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, ai_quota FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| -> Result<QuotaRecord, sqlx::Error> {
            Ok(QuotaRecord {
                identity: UserIdentity::new(row.try_get("id")?, row.try_get::<String, _>("username")?),
                quota_seconds: row.try_get("ai_quota")?,
            })
        })
        .transpose()
        .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    /// Grant `seconds` of quota, creating the user if needed.
    ///
    /// New users are named `username`, or `user-<id>` when none is given;
    /// an existing user keeps their name unless one is supplied.
    pub async fn set_quota(
        &self,
        user_id: UserId,
        seconds: i64,
        username: Option<&str>,
    ) -> Result<QuotaRecord, RepositoryError> {
        if seconds < 0 {
            return Err(RepositoryError::Conflict(format!(
                "quota must not be negative, got {seconds}"
            )));
        }
        let now = format_datetime(&Utc::now());
        let default_name = format!("user-{user_id}");

        sqlx::query(
            r#"INSERT INTO users (id, username, ai_quota, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   ai_quota = excluded.ai_quota,
                   username = COALESCE(?, users.username),
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(username.unwrap_or(&default_name))
        .bind(seconds)
        .bind(&now)
        .bind(&now)
        .bind(username)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::info!(user_id, seconds, "Quota updated");

        // Read back through the writer so the row is visible immediately.
        let row = sqlx::query("SELECT username FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(QuotaRecord {
            identity: UserIdentity::new(user_id, username),
            quota_seconds: seconds,
        })
    }
}

impl QuotaRepository for SqliteQuotaRepository {
    async fn load_quota(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        Ok(self
            .find(user_id)
            .await?
            .map(|record| record.quota_seconds)
            .unwrap_or(0))
    }

    async fn commit_remaining_quota(
        &self,
        user_id: UserId,
        remaining_seconds: i64,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        let result = sqlx::query("UPDATE users SET ai_quota = ?, updated_at = ? WHERE id = ?")
            .bind(remaining_seconds.max(0))
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
