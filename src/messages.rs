use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub replied_to: Option<i64>,
}

/// Owns every message record; the chat list and the event router only
/// touch messages through these operations.
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists one message. Empty text or a missing endpoint is a
    /// validation failure and nothing is stored. The reply target is not
    /// checked; it resolves (or doesn't) at read time.
    pub async fn append(
        &self,
        sender: &str,
        receiver: &str,
        text: &str,
        replied_to: Option<i64>,
    ) -> Result<Message, StoreError> {
        if sender.is_empty() || receiver.is_empty() {
            return Err(StoreError::Validation("sender and receiver are required"));
        }
        if text.is_empty() {
            return Err(StoreError::Validation("text must not be empty"));
        }

        let timestamp = Utc::now();
        let id = sqlx::query(
            "INSERT INTO messages (sender,receiver,text,timestamp,is_read,replied_to) VALUES (?,?,?,?,0,?)",
        )
        .bind(sender)
        .bind(receiver)
        .bind(text)
        .bind(timestamp)
        .bind(replied_to)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Message {
            id,
            sender: sender.to_owned(),
            receiver: receiver.to_owned(),
            text: text.to_owned(),
            timestamp,
            is_read: false,
            replied_to,
        })
    }

    /// Everything exchanged between `a` and `b`, in either direction,
    /// oldest first (timestamp, then id on ties).
    pub async fn conversation(&self, a: &str, b: &str) -> sqlx::Result<Vec<Message>> {
        sqlx::query_as(
            "SELECT id,sender,receiver,text,timestamp,is_read,replied_to FROM messages
             WHERE (sender=? AND receiver=?) OR (sender=? AND receiver=?)
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn unread_from(&self, sender: &str, receiver: &str) -> sqlx::Result<Vec<Message>> {
        sqlx::query_as(
            "SELECT id,sender,receiver,text,timestamp,is_read,replied_to FROM messages
             WHERE sender=? AND receiver=? AND is_read=0
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(sender)
        .bind(receiver)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn unread_count(&self, sender: &str, receiver: &str) -> sqlx::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages WHERE sender=? AND receiver=? AND is_read=0",
        )
        .bind(sender)
        .bind(receiver)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Flips everything unread from `sender` to `receiver` in one
    /// statement and returns how many messages actually transitioned.
    /// Already-read messages are untouched, so a repeat call returns 0.
    pub async fn mark_read(&self, sender: &str, receiver: &str) -> sqlx::Result<u64> {
        let result =
            sqlx::query("UPDATE messages SET is_read=1 WHERE sender=? AND receiver=? AND is_read=0")
                .bind(sender)
                .bind(receiver)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Every identity `user` has ever exchanged a message with.
    pub async fn partners_of(&self, user: &str) -> sqlx::Result<BTreeSet<String>> {
        let endpoints: Vec<(String, String)> =
            sqlx::query_as("SELECT sender,receiver FROM messages WHERE sender=? OR receiver=?")
                .bind(user)
                .bind(user)
                .fetch_all(&self.pool)
                .await?;
        Ok(endpoints
            .into_iter()
            .map(|(sender, receiver)| if sender == user { receiver } else { sender })
            .collect())
    }

    /// Text and sender of the message a reply points at. A dangling id
    /// is not an error, just no metadata.
    pub async fn resolve_reply(&self, id: i64) -> sqlx::Result<Option<(String, String)>> {
        sqlx::query_as("SELECT text,sender FROM messages WHERE id=?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> MessageStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init(&pool).await.unwrap();
        MessageStore::new(pool)
    }

    #[tokio::test]
    async fn append_lands_in_conversation_once_and_unread() {
        let store = store().await;
        let msg = store.append("alice", "bob", "hi", None).await.unwrap();
        assert!(!msg.is_read);

        let conv = store.conversation("alice", "bob").await.unwrap();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv[0].id, msg.id);
        assert_eq!(conv[0].text, "hi");
        assert!(!conv[0].is_read);

        // same thread seen from the other side
        assert_eq!(store.conversation("bob", "alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_rejects_empty_fields() {
        let store = store().await;
        for (sender, receiver, text) in [("alice", "bob", ""), ("", "bob", "hi"), ("alice", "", "hi")] {
            assert!(matches!(
                store.append(sender, receiver, text, None).await,
                Err(StoreError::Validation(_))
            ));
        }
        assert!(store.conversation("alice", "bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_transitions_once() {
        let store = store().await;
        store.append("alice", "bob", "one", None).await.unwrap();
        store.append("alice", "bob", "two", None).await.unwrap();

        assert_eq!(store.unread_count("alice", "bob").await.unwrap(), 2);
        assert_eq!(store.unread_from("alice", "bob").await.unwrap().len(), 2);

        assert_eq!(store.mark_read("alice", "bob").await.unwrap(), 2);
        assert_eq!(store.mark_read("alice", "bob").await.unwrap(), 0);

        assert_eq!(store.unread_count("alice", "bob").await.unwrap(), 0);
        assert!(store.unread_from("alice", "bob").await.unwrap().is_empty());
        assert!(store.conversation("alice", "bob").await.unwrap().iter().all(|m| m.is_read));
    }

    #[tokio::test]
    async fn mark_read_only_touches_one_direction() {
        let store = store().await;
        store.append("alice", "bob", "to bob", None).await.unwrap();
        store.append("bob", "alice", "to alice", None).await.unwrap();

        assert_eq!(store.mark_read("alice", "bob").await.unwrap(), 1);
        assert_eq!(store.unread_count("bob", "alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reply_resolution_and_dangling_target() {
        let store = store().await;
        let first = store.append("alice", "bob", "question", None).await.unwrap();
        let reply = store.append("bob", "alice", "answer", Some(first.id)).await.unwrap();

        assert_eq!(
            store.resolve_reply(first.id).await.unwrap(),
            Some(("question".to_owned(), "alice".to_owned()))
        );
        assert_eq!(store.resolve_reply(reply.id + 1000).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partners_union_both_directions() {
        let store = store().await;
        store.append("alice", "bob", "hey", None).await.unwrap();
        store.append("zoe", "alice", "yo", None).await.unwrap();

        let partners: Vec<String> = store.partners_of("alice").await.unwrap().into_iter().collect();
        assert_eq!(partners, ["bob", "zoe"]);
        assert!(store.partners_of("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_ids() {
        let store = store().await;
        let (a, b) = tokio::join!(
            store.append("alice", "bob", "first", None),
            store.append("bob", "alice", "second", None),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id, b.id);

        let mut ids: Vec<i64> = store
            .conversation("alice", "bob")
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}
