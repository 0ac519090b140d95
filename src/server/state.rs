//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chat::{
    ChatConfig, ChatResult, ConversationController, SessionStore, SharedSessionStore,
    build_generator, open_storage,
};

/// Shared application state.
pub struct AppState {
    /// Send-message workflow; owns the shared session store.
    pub controller: ConversationController,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Wrap an existing controller.
    #[must_use]
    pub fn new(controller: ConversationController, static_dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            controller,
            static_dir: static_dir.into(),
        })
    }

    /// Open storage, load sessions, and build the configured generator.
    ///
    /// # Errors
    /// Returns an error if the storage backend cannot be opened or the
    /// generator cannot be built.
    pub async fn from_config(config: &ChatConfig) -> ChatResult<Arc<Self>> {
        let storage = open_storage(&config.storage).await?;
        let store = SessionStore::load(storage, &config.conversation).await;
        let generator = build_generator(&config.generation)?;
        tracing::info!(
            "Using {} model {}",
            generator.name(),
            config.generation.model
        );

        let controller = ConversationController::new(
            Arc::new(RwLock::new(store)),
            generator,
            config.conversation.system_instruction.clone(),
        );
        Ok(Self::new(controller, config.server.static_dir.clone()))
    }

    /// Shared session store.
    #[must_use]
    pub const fn store(&self) -> &SharedSessionStore {
        self.controller.store()
    }
}
