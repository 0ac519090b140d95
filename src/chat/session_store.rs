//! Session collection ownership and persistence.
//!
//! The store is the only writer of the session collection. Every mutation of
//! the collection is followed by a full save of the slot; selection changes
//! are not persisted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chat::core::config::ConversationConfig;
use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::SessionId;
use crate::chat::core::message::Message;
use crate::chat::core::session::{Session, SessionSummary};
use crate::chat::storage::{SessionStorage, decode_sessions, encode_sessions};

/// Ordered session collection plus the current selection.
///
/// Invariant: `current` is `Some` and names a present session iff `sessions`
/// is non-empty.
pub struct SessionStore {
    sessions: Vec<Session>,
    current: Option<SessionId>,
    storage: Arc<dyn SessionStorage>,
    default_title: String,
    title_max_chars: usize,
}

impl SessionStore {
    /// Rehydrate the collection from storage.
    ///
    /// This is the only read of the slot. When nothing was saved, or the
    /// saved payload cannot be read, parsed, or validated, the store starts
    /// with one fresh default session. A saved empty collection stays empty.
    pub async fn load(storage: Arc<dyn SessionStorage>, config: &ConversationConfig) -> Self {
        let mut store = Self {
            sessions: Vec::new(),
            current: None,
            storage,
            default_title: config.default_title.clone(),
            title_max_chars: config.title_max_chars,
        };

        let restored = match store.storage.load().await {
            Ok(Some(payload)) => match decode_sessions(&payload) {
                Ok(sessions) => Some(sessions),
                Err(err) => {
                    warn!("Discarding unreadable session data: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("Failed to read session storage: {err}");
                None
            }
        };

        if let Some(sessions) = restored {
            store.current = sessions.first().map(|s| s.id);
            store.sessions = sessions;
            info!("Loaded {} sessions", store.sessions.len());
        } else {
            store.create_session().await;
            info!("Started with a fresh default session");
        }

        store
    }

    /// Create a session at the front of the collection and make it current.
    pub async fn create_session(&mut self) -> SessionId {
        let session = Session::new(self.default_title.clone());
        let id = session.id;
        self.sessions.insert(0, session);
        self.current = Some(id);
        debug!("Created session {id}");
        self.persist_or_warn().await;
        id
    }

    /// Make `id` current. Returns `false`, changing nothing, if it is unknown.
    pub fn select_session(&mut self, id: SessionId) -> bool {
        if self.sessions.iter().any(|s| s.id == id) {
            self.current = Some(id);
            debug!("Selected session {id}");
            true
        } else {
            false
        }
    }

    /// Remove a session. Returns `false` if it was not present.
    ///
    /// Deleting the current session moves the selection to the new first
    /// session, or clears it when none remain.
    pub async fn delete_session(&mut self, id: SessionId) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            return false;
        };
        self.sessions.remove(index);
        if self.current == Some(id) {
            self.current = self.sessions.first().map(|s| s.id);
        }
        debug!("Deleted session {id}");
        self.persist_or_warn().await;
        true
    }

    /// Append `message` to a session, applying the first-message title rule.
    ///
    /// Returns `false`, changing nothing, if the session does not exist.
    pub async fn append_message(&mut self, session_id: SessionId, message: Message) -> bool {
        let title_max_chars = self.title_max_chars;
        let Some(session) = self.session_mut(session_id) else {
            debug!("Dropping message for missing session {session_id}");
            return false;
        };
        session.push(message, title_max_chars);
        self.persist_or_warn().await;
        true
    }

    /// Save the whole collection, overwriting the slot.
    ///
    /// # Errors
    /// Returns an error if encoding or the storage write fails.
    pub async fn persist(&self) -> ChatResult<()> {
        let payload = encode_sessions(&self.sessions)?;
        self.storage.save(payload).await
    }

    async fn persist_or_warn(&self) {
        if let Err(err) = self.persist().await {
            warn!("Failed to persist sessions: {err}");
        }
    }

    /// Sessions, newest first.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Current session id, if any.
    #[must_use]
    pub const fn current_session_id(&self) -> Option<SessionId> {
        self.current
    }

    /// Current session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<&Session> {
        self.current.and_then(|id| self.session(id))
    }

    /// Session by id.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Sidebar projections, newest first.
    #[must_use]
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|s| s.summary(self.current == Some(s.id)))
            .collect()
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::message::Sender;
    use crate::chat::storage::InMemoryStorage;

    fn config() -> ConversationConfig {
        ConversationConfig {
            default_title: "New chat".to_string(),
            ..ConversationConfig::default()
        }
    }

    fn assert_current_invariant(store: &SessionStore) {
        match store.current_session_id() {
            Some(id) => assert!(store.session(id).is_some()),
            None => assert!(store.is_empty()),
        }
        assert_eq!(store.current_session_id().is_none(), store.is_empty());
    }

    async fn fresh_store() -> (Arc<InMemoryStorage>, SessionStore) {
        let storage = Arc::new(InMemoryStorage::new());
        let store = SessionStore::load(storage.clone(), &config()).await;
        (storage, store)
    }

    #[tokio::test]
    async fn test_load_without_data_creates_default_session() {
        let (storage, store) = fresh_store().await;
        assert_eq!(store.len(), 1);
        let current = store.current_session().unwrap();
        assert_eq!(current.title, "New chat");
        assert!(current.messages.is_empty());
        assert_eq!(storage.save_count(), 1);
    }

    #[tokio::test]
    async fn test_load_corrupt_data_creates_default_session() {
        let storage = Arc::new(InMemoryStorage::with_payload("{\"version\":1,\"sessions\":[{"));
        let store = SessionStore::load(storage, &config()).await;
        assert_eq!(store.len(), 1);
        assert_current_invariant(&store);
    }

    #[tokio::test]
    async fn test_load_other_version_creates_default_session() {
        let storage = Arc::new(InMemoryStorage::with_payload(
            r#"{"version":7,"sessions":[]}"#,
        ));
        let store = SessionStore::load(storage, &config()).await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_load_saved_empty_collection_stays_empty() {
        let storage = Arc::new(InMemoryStorage::with_payload(
            r#"{"version":1,"sessions":[]}"#,
        ));
        let store = SessionStore::load(storage, &config()).await;
        assert!(store.is_empty());
        assert!(store.current_session_id().is_none());
    }

    #[tokio::test]
    async fn test_create_inserts_at_front_and_selects() {
        let (_, mut store) = fresh_store().await;
        let first = store.current_session_id().unwrap();
        let second = store.create_session().await;

        assert_eq!(store.sessions()[0].id, second);
        assert_eq!(store.sessions()[1].id, first);
        assert_eq!(store.current_session_id(), Some(second));
    }

    #[tokio::test]
    async fn test_select_unknown_is_ignored() {
        let (storage, mut store) = fresh_store().await;
        let current = store.current_session_id();
        let saves = storage.save_count();

        assert!(!store.select_session(SessionId::new()));
        assert_eq!(store.current_session_id(), current);
        assert_eq!(storage.save_count(), saves);
    }

    #[tokio::test]
    async fn test_select_existing() {
        let (_, mut store) = fresh_store().await;
        let older = store.current_session_id().unwrap();
        store.create_session().await;
        assert!(store.select_session(older));
        assert_eq!(store.current_session_id(), Some(older));
    }

    #[tokio::test]
    async fn test_delete_current_moves_selection_to_first() {
        let (_, mut store) = fresh_store().await;
        let a = store.current_session_id().unwrap();
        let b = store.create_session().await;
        let c = store.create_session().await;
        assert!(store.select_session(b));

        assert!(store.delete_session(b).await);
        assert_eq!(store.current_session_id(), Some(c));
        assert_eq!(store.len(), 2);

        assert!(store.delete_session(a).await);
        assert_eq!(store.current_session_id(), Some(c));
    }

    #[tokio::test]
    async fn test_delete_only_session_clears_current() {
        let (storage, mut store) = fresh_store().await;
        let only = store.current_session_id().unwrap();
        assert!(store.delete_session(only).await);
        assert!(store.is_empty());
        assert!(store.current_session_id().is_none());

        let payload = storage.payload().await.unwrap();
        assert!(decode_sessions(&payload).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (storage, mut store) = fresh_store().await;
        let saves = storage.save_count();
        assert!(!store.delete_session(SessionId::new()).await);
        assert_eq!(store.len(), 1);
        assert_eq!(storage.save_count(), saves);
    }

    #[tokio::test]
    async fn test_current_invariant_over_create_delete_sequences() {
        let (_, mut store) = fresh_store().await;
        let mut ids = vec![store.current_session_id().unwrap()];
        // Deterministic interleaving of creates, deletes, and selections.
        for step in 0..40_usize {
            match step % 5 {
                0 | 3 => ids.push(store.create_session().await),
                1 => {
                    if let Some(id) = ids.first().copied() {
                        store.delete_session(id).await;
                        ids.remove(0);
                    }
                }
                2 => {
                    if let Some(id) = ids.last().copied() {
                        store.select_session(id);
                    }
                }
                _ => {
                    if let Some(id) = store.current_session_id() {
                        store.delete_session(id).await;
                        ids.retain(|x| *x != id);
                    }
                }
            }
            assert_current_invariant(&store);
        }

        while let Some(id) = store.current_session_id() {
            store.delete_session(id).await;
            assert_current_invariant(&store);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_append_sets_title_once() {
        let (_, mut store) = fresh_store().await;
        let id = store.current_session_id().unwrap();

        assert!(
            store
                .append_message(id, Message::user("Explain ownership and borrowing in Rust"))
                .await
        );
        assert_eq!(store.session(id).unwrap().title, "Explain ownership and bor");

        store.append_message(id, Message::assistant("Sure.")).await;
        store.append_message(id, Message::user("Thanks")).await;
        let session = store.session(id).unwrap();
        assert_eq!(session.title, "Explain ownership and bor");
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[1].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_append_to_missing_session_is_noop() {
        let (storage, mut store) = fresh_store().await;
        let saves = storage.save_count();
        assert!(!store.append_message(SessionId::new(), Message::user("x")).await);
        assert_eq!(storage.save_count(), saves);
        assert!(store.current_session().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_every_mutation_persists() {
        let (storage, mut store) = fresh_store().await;
        let id = store.current_session_id().unwrap();
        store.append_message(id, Message::user("one")).await;
        let other = store.create_session().await;
        store.delete_session(other).await;
        assert_eq!(storage.save_count(), 4);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_mutation() {
        let (storage, mut store) = fresh_store().await;
        storage.set_fail_saves(true);

        let id = store.create_session().await;
        assert_eq!(store.current_session_id(), Some(id));
        assert!(store.append_message(id, Message::user("kept")).await);
        assert_eq!(store.session(id).unwrap().messages.len(), 1);
        assert!(store.persist().await.is_err());
    }

    #[tokio::test]
    async fn test_reload_reproduces_collection() {
        let (storage, mut store) = fresh_store().await;
        let first = store.current_session_id().unwrap();
        store.append_message(first, Message::user("hello")).await;
        store.append_message(first, Message::assistant("hi")).await;
        let second = store.create_session().await;
        store.append_message(second, Message::user("another")).await;

        let reloaded = SessionStore::load(storage, &config()).await;
        assert_eq!(reloaded.sessions(), store.sessions());
        assert_eq!(reloaded.current_session_id(), Some(second));
    }

    #[tokio::test]
    async fn test_summaries_flag_current() {
        let (_, mut store) = fresh_store().await;
        let newest = store.create_session().await;
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, newest);
        assert!(summaries[0].is_current);
        assert!(!summaries[1].is_current);
    }
}
