//! Database test fixtures
//!
//! Every fixture gets its own SQLite file inside a temporary directory, so
//! tests can run in parallel without sharing rows.

use chrono::{Duration, Utc};
use social_hub::backend::auth::SqlSessionStore;
use social_hub::backend::server::config::load_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct TestDatabase {
    pool: SqlitePool,
    url: String,
    // removed on drop
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("social.db").display());
        let pool = load_database(&url)
            .await
            .expect("Failed to open test database");
        Self {
            pool,
            url,
            _dir: dir,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a session for `user_id` valid for the next hour and return its token.
    pub async fn login(&self, user_id: i64) -> String {
        let token = format!("session-{}-{}", user_id, uuid::Uuid::new_v4());
        SqlSessionStore::new(self.pool.clone())
            .create_session(&token, user_id, Utc::now() + Duration::hours(1))
            .await
            .expect("Failed to create session");
        token
    }

    /// Issue a session that has already expired.
    pub async fn expired_login(&self, user_id: i64) -> String {
        let token = format!("expired-{}", uuid::Uuid::new_v4());
        SqlSessionStore::new(self.pool.clone())
            .create_session(&token, user_id, Utc::now() - Duration::minutes(1))
            .await
            .expect("Failed to create session");
        token
    }

    pub async fn stored_messages(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count messages")
    }
}
