//! Core chat types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;
pub mod session;

pub use config::{
    ChatConfig, ConversationConfig, GenerationConfig, GenerationProvider, ServerConfig,
    StorageBackend, StorageConfig,
};
pub use errors::{ChatError, ChatResult};
pub use ids::{MessageId, SessionId};
pub use message::{Message, Sender};
pub use session::{Session, SessionSummary};
