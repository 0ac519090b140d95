//! Durable storage for the session collection.
//!
//! Storage is a single named slot holding the whole collection as versioned
//! JSON text. Backends only move text in and out of the slot; encoding,
//! version checks, and validation live here.

pub mod json_file;
pub mod memory_store;
pub mod sqlite_store;

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::core::config::{StorageBackend, StorageConfig};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::session::Session;

pub use json_file::JsonFileStorage;
pub use memory_store::InMemoryStorage;
pub use sqlite_store::SqliteSessionStorage;

/// Schema version written with every save.
pub const SCHEMA_VERSION: u32 = 1;

/// Boxed future type for storage operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Port over the durable slot.
pub trait SessionStorage: Send + Sync {
    /// Read the slot. `None` when nothing was ever saved.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn load(&self) -> StorageFuture<'_, ChatResult<Option<String>>>;

    /// Overwrite the slot wholesale.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn save(&self, payload: String) -> StorageFuture<'_, ChatResult<()>>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    sessions: &'a [Session],
}

#[derive(Deserialize)]
struct Envelope {
    sessions: Vec<Session>,
}

/// Serialize the collection into the versioned envelope.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode_sessions(sessions: &[Session]) -> ChatResult<String> {
    let envelope = EnvelopeRef {
        version: SCHEMA_VERSION,
        sessions,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse and validate a stored envelope.
///
/// # Errors
/// Returns an error on malformed JSON, a schema version other than
/// [`SCHEMA_VERSION`], or duplicate identifiers.
pub fn decode_sessions(payload: &str) -> ChatResult<Vec<Session>> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    let found = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);
    if found != SCHEMA_VERSION {
        return Err(ChatError::UnsupportedSchema {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    validate_sessions(&envelope.sessions)?;
    Ok(envelope.sessions)
}

fn validate_sessions(sessions: &[Session]) -> ChatResult<()> {
    let mut session_ids = HashSet::with_capacity(sessions.len());
    for session in sessions {
        if !session_ids.insert(session.id) {
            return Err(ChatError::InvalidStoredData(format!(
                "duplicate session id {}",
                session.id
            )));
        }

        let mut message_ids = HashSet::with_capacity(session.messages.len());
        for message in &session.messages {
            if !message_ids.insert(message.id) {
                return Err(ChatError::InvalidStoredData(format!(
                    "duplicate message id {} in session {}",
                    message.id, session.id
                )));
            }
        }
    }
    Ok(())
}

/// Open the backend selected by configuration.
///
/// # Errors
/// Returns an error if the backend cannot be opened.
pub async fn open_storage(config: &StorageConfig) -> ChatResult<Arc<dyn SessionStorage>> {
    match config.backend {
        StorageBackend::JsonFile => Ok(Arc::new(JsonFileStorage::new(config.path.clone()))),
        StorageBackend::Sqlite => {
            let storage = SqliteSessionStorage::open(&config.path, &config.slot).await?;
            Ok(Arc::new(storage))
        }
    }
}
