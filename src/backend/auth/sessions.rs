/**
 * Session Resolution
 *
 * Sessions are issued by the login flow, which lives outside the chat core.
 * Here we only turn a session token into the user id it was issued for.
 * Unknown and expired tokens both resolve to `None`.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::backend::chat::db::{decode_timestamp, encode_timestamp};
use crate::backend::error::BackendError;
use crate::shared::UserId;

/// Resolves session tokens to user ids.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>, BackendError>;
}

/// `SessionStore` backed by the `sessions` table.
#[derive(Clone, Debug)]
pub struct SqlSessionStore {
    pool: SqlitePool,
}

impl SqlSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a session. Used by the login flow and by tests.
    pub async fn create_session(
        &self,
        token: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_token, user_id, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT (session_token) DO UPDATE SET
                user_id = excluded.user_id,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(encode_timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn user_for_token(&self, token: &str) -> Result<Option<UserId>, BackendError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE session_token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        let Some((user_id, expires_at)) = row else {
            tracing::debug!("[Auth] Unknown session token");
            return Ok(None);
        };

        let expires_at = decode_timestamp(&expires_at)?;
        if Utc::now() >= expires_at {
            tracing::debug!(user_id, %expires_at, "[Auth] Session expired");
            return Ok(None);
        }

        Ok(Some(user_id))
    }
}
