//! Chat subsystem for the Webhub assistant.
//!
//! Organized into:
//! - `core`: Configuration, errors, IDs, messages, and sessions
//! - `storage`: Single-slot persistence backends (JSON file, `SQLite`, in-memory)
//! - `generation`: Text-generation providers and fallback replies
//! - `session_store`: The owned session collection and its persistence
//! - `controller`: The send-message workflow

pub mod controller;
pub mod core;
pub mod generation;
pub mod session_store;
pub mod storage;

// Re-export commonly used types for convenience
pub use controller::{
    ControllerStatus, ConversationController, RejectReason, Reply, ReplySource, SendOutcome,
    SharedSessionStore,
};
pub use core::{
    ChatConfig, ChatError, ChatResult, ConversationConfig, GenerationConfig, GenerationProvider,
    Message, MessageId, Sender, ServerConfig, Session, SessionId, SessionSummary, StorageBackend,
    StorageConfig,
};
pub use generation::{
    EMPTY_REPLY_TEXT, FallbackResponses, GeminiGenerator, GenerateFuture, GenerationRequest,
    OllamaGenerator, TextGenerator, build_generator,
};
pub use session_store::SessionStore;
pub use storage::{
    InMemoryStorage, JsonFileStorage, SessionStorage, SqliteSessionStorage, StorageFuture,
    open_storage,
};
