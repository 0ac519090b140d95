//! SQLite-backed slot storage.

use std::path::Path;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::core::errors::ChatResult;
use crate::chat::storage::{SessionStorage, StorageFuture};

/// Slot stored as one row of a key/value table.
pub struct SqliteSessionStorage {
    conn: Connection,
    table: String,
    slot: String,
}

impl SqliteSessionStorage {
    /// Table name for slots.
    pub const DEFAULT_TABLE: &'static str = "chat_slots";

    /// Open the database at `path` and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn open(path: &Path, slot: &str) -> ChatResult<Self> {
        let conn = Connection::open(path).await?;
        Self::with_connection(conn, slot).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn open_in_memory(slot: &str) -> ChatResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn, slot).await
    }

    async fn with_connection(conn: Connection, slot: &str) -> ChatResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    slot TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            table,
            slot: slot.to_string(),
        })
    }
}

impl SessionStorage for SqliteSessionStorage {
    fn load(&self) -> StorageFuture<'_, ChatResult<Option<String>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let slot = self.slot.clone();
            let payload = self
                .conn
                .call(move |conn| {
                    let payload = conn
                        .query_row(
                            &format!("SELECT payload FROM {table} WHERE slot = ?1"),
                            rusqlite::params![slot],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(payload)
                })
                .await?;
            Ok(payload)
        })
    }

    fn save(&self, payload: String) -> StorageFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            let slot = self.slot.clone();
            let now_ms = chrono::Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (slot, payload, updated_at)
                             VALUES (?1, ?2, ?3)
                             ON CONFLICT(slot) DO UPDATE
                             SET payload = excluded.payload, updated_at = excluded.updated_at"
                        ),
                        rusqlite::params![slot, payload, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_slot_loads_none() {
        let storage = SqliteSessionStorage::open_in_memory("chats").await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_slot() {
        let storage = SqliteSessionStorage::open_in_memory("chats").await.unwrap();
        storage.save("first".to_string()).await.unwrap();
        storage.save("second".to_string()).await.unwrap();
        assert_eq!(storage.load().await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_slots_are_isolated_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.sqlite");

        let a = SqliteSessionStorage::open(&path, "a").await.unwrap();
        a.save("payload-a".to_string()).await.unwrap();

        let b = SqliteSessionStorage::open(&path, "b").await.unwrap();
        assert!(b.load().await.unwrap().is_none());

        let reopened = SqliteSessionStorage::open(&path, "a").await.unwrap();
        assert_eq!(
            reopened.load().await.unwrap().as_deref(),
            Some("payload-a")
        );
    }
}
