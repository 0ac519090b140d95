//! In-memory slot for tests and ephemeral runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::storage::{SessionStorage, StorageFuture};

/// Slot held in process memory.
#[derive(Default)]
pub struct InMemoryStorage {
    payload: Mutex<Option<String>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryStorage {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `payload`.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(payload.into())),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail with an I/O error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current slot contents.
    pub async fn payload(&self) -> Option<String> {
        self.payload.lock().await.clone()
    }
}

impl SessionStorage for InMemoryStorage {
    fn load(&self) -> StorageFuture<'_, ChatResult<Option<String>>> {
        Box::pin(async move { Ok(self.payload.lock().await.clone()) })
    }

    fn save(&self, payload: String) -> StorageFuture<'_, ChatResult<()>> {
        Box::pin(async move {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(ChatError::Io(std::io::Error::other("quota exceeded")));
            }
            *self.payload.lock().await = Some(payload);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
