//! SQLite access-token repository.
//!
//! Tokens are random, shown once at issue time and stored only as a
//! SHA-256 hash (lowercase hex). Resolving a token hashes the presented
//! value and looks the hash up; revoked tokens never resolve.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::Row;
use uuid::Uuid;

use examiner_core::repository::token::AccessTokenRepository;
use examiner_types::error::RepositoryError;
use examiner_types::identity::{UserId, UserIdentity};

use super::format_datetime;
use super::pool::DatabasePool;

/// Prefix of every issued token.
pub const TOKEN_PREFIX: &str = "exm_";

/// Compute the SHA-256 hash of a token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    format!(
        "{TOKEN_PREFIX}{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// SQLite-backed implementation of `AccessTokenRepository`.
#[derive(Clone)]
pub struct SqliteAccessTokenRepository {
    pool: DatabasePool,
}

impl SqliteAccessTokenRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl AccessTokenRepository for SqliteAccessTokenRepository {
    async fn resolve(&self, token: &str) -> Result<Option<UserIdentity>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT t.id AS token_id, u.id AS user_id, u.username
               FROM access_tokens t
               JOIN users u ON u.id = t.user_id
               WHERE t.token_hash = ? AND t.revoked_at IS NULL"#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token_id: String = row
            .try_get("token_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let user_id: UserId = row
            .try_get("user_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Best effort; a failed touch must not reject the connection.
        if let Err(err) = sqlx::query("UPDATE access_tokens SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_id)
            .execute(&self.pool.writer)
            .await
        {
            tracing::debug!(%token_id, error = %err, "Failed to record token use");
        }

        Ok(Some(UserIdentity::new(user_id, username)))
    }

    async fn issue(&self, user_id: UserId) -> Result<String, RepositoryError> {
        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let token = generate_token();
        let id = Uuid::now_v7().to_string();
        sqlx::query(
            "INSERT INTO access_tokens (id, token_hash, user_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict("token hash collision".to_string())
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        tracing::info!(user_id, token_id = %id, "Access token issued");
        Ok(token)
    }

    async fn revoke(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE access_tokens SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(format_datetime(&Utc::now()))
        .bind(hash_token(token))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
