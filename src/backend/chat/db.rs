/**
 * Chat Store
 *
 * Persistence for chat messages. The rest of the core only sees the
 * `ChatStore` trait; `SqlChatStore` is the sqlx/SQLite implementation.
 *
 * The store is shared by every connection task at once, so implementations
 * must accept concurrent callers. The sqlx pool takes care of that here.
 *
 * History between two users is ordered newest first by `created_at`, with the
 * row id breaking ties between messages stamped in the same instant.
 */

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::shared::{ChatMessage, UserId};

/// Storage format for timestamps: fixed width, so text order is time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, BackendError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            BackendError::Database(sqlx::Error::Decode(
                format!("bad timestamp {:?}: {}", raw, e).into(),
            ))
        })
}

/// Insert and query operations the dispatcher needs.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist one message and return the stored record.
    async fn store_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<ChatMessage, BackendError>;

    /// Number of messages exchanged between `a` and `b`, either direction.
    async fn count_between(&self, a: UserId, b: UserId) -> Result<i64, BackendError>;

    /// Up to `limit` messages between `a` and `b`, newest first, skipping `offset`.
    async fn messages_between(
        &self,
        a: UserId,
        b: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, BackendError>;
}

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: i64,
    sender_id: i64,
    receiver_id: i64,
    message: String,
    created_at: String,
}

impl TryFrom<ChatRow> for ChatMessage {
    type Error = BackendError;

    fn try_from(row: ChatRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            message: row.message,
            created_at: decode_timestamp(&row.created_at)?,
        })
    }
}

/// `ChatStore` backed by the `chats` table.
#[derive(Clone, Debug)]
pub struct SqlChatStore {
    pool: SqlitePool,
}

impl SqlChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for SqlChatStore {
    async fn store_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<ChatMessage, BackendError> {
        let created_at = at.trunc_subsecs(6);

        let result = sqlx::query(
            r#"
            INSERT INTO chats (sender_id, receiver_id, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(text)
        .bind(encode_timestamp(created_at))
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            sender_id,
            receiver_id,
            message: text.to_string(),
            created_at,
        })
    }

    async fn count_between(&self, a: UserId, b: UserId) -> Result<i64, BackendError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chats
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn messages_between(
        &self,
        a: UserId,
        b: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, BackendError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, sender_id, receiver_id, message, created_at
            FROM chats
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::server::config::load_database;
    use chrono::{Duration, TimeZone};

    async fn store() -> SqlChatStore {
        SqlChatStore::new(load_database("sqlite::memory:").await.unwrap())
    }

    #[test]
    fn test_timestamp_encoding_round_trips_and_sorts() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let later = earlier + Duration::microseconds(1500);

        let a = encode_timestamp(earlier);
        let b = encode_timestamp(later);
        assert_eq!(a, "2024-01-02T03:04:05.000000Z");
        assert!(a < b);
        assert_eq!(decode_timestamp(&b).unwrap(), later);
    }

    #[tokio::test]
    async fn test_store_and_count_both_directions() {
        let store = store().await;
        let now = Utc::now();
        store.store_message(1, 2, "hi", now).await.unwrap();
        store.store_message(2, 1, "hey", now).await.unwrap();
        store.store_message(1, 3, "elsewhere", now).await.unwrap();

        assert_eq!(store.count_between(1, 2).await.unwrap(), 2);
        assert_eq!(store.count_between(2, 1).await.unwrap(), 2);
        assert_eq!(store.count_between(2, 3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_messages_between_newest_first_with_offset() {
        let store = store().await;
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        for i in 0..5 {
            let (from, to) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
            store
                .store_message(from, to, &format!("m{}", i), base + Duration::seconds(i))
                .await
                .unwrap();
        }
        store.store_message(1, 9, "noise", base).await.unwrap();

        let page = store.messages_between(1, 2, 3, 0).await.unwrap();
        let texts: Vec<_> = page.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m4", "m3", "m2"]);
        assert!(page.iter().all(|m| m.is_between(1, 2)));

        let rest = store.messages_between(2, 1, 3, 3).await.unwrap();
        let texts: Vec<_> = rest.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m1", "m0"]);
    }

    #[tokio::test]
    async fn test_same_instant_ties_break_on_id() {
        let store = store().await;
        let at = Utc::now();
        let first = store.store_message(1, 2, "first", at).await.unwrap();
        let second = store.store_message(1, 2, "second", at).await.unwrap();
        assert!(second.id > first.id);

        let page = store.messages_between(1, 2, 10, 0).await.unwrap();
        assert_eq!(page[0].message, "second");
        assert_eq!(page[1].message, "first");
    }

    #[tokio::test]
    async fn test_stored_record_matches_query() {
        let store = store().await;
        let stored = store.store_message(4, 5, "persisted", Utc::now()).await.unwrap();
        let fetched = store.messages_between(5, 4, 10, 0).await.unwrap();
        assert_eq!(fetched, vec![stored]);
    }
}
