//! Configuration for the chat client.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// System instruction sent with every generation request.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Siz aqlli va foydali yordamchisiz. O'zbek tilida, do'stona va professional suhbat quring. O'z ismingizni har bir gapda takrorlamang. Savollarga aniq va qisqa javob bering.";

/// Title given to a session before its first user message.
pub const DEFAULT_SESSION_TITLE: &str = "Yangi suhbat";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "ministral-3:8b-instruct-2512-q8_0";

/// Environment variable prefix shared by every setting.
const ENV_PREFIX: &str = "WEBHUB_";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Generation provider settings.
    pub generation: GenerationConfig,
    /// Conversation behaviour.
    pub conversation: ConversationConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl ChatConfig {
    /// Build configuration from `WEBHUB_*` environment variables over defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup over defaults.
    ///
    /// Keys are the full variable names (`WEBHUB_MODEL`, ...). Unparsable
    /// numeric values keep their default.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(backend) = get("STORAGE") {
            if backend.eq_ignore_ascii_case("sqlite") {
                config.storage.backend = StorageBackend::Sqlite;
                config.storage.path = PathBuf::from(StorageConfig::DEFAULT_SQLITE_PATH);
            }
        }
        if let Some(path) = get("STORAGE_PATH") {
            config.storage.path = PathBuf::from(path);
        }
        if let Some(slot) = get("STORAGE_SLOT") {
            config.storage.slot = slot;
        }

        if let Some(provider) = get("PROVIDER") {
            if provider.eq_ignore_ascii_case("ollama") {
                config.generation.provider = GenerationProvider::Ollama;
                config.generation.model = DEFAULT_OLLAMA_MODEL.to_string();
            }
        }
        if let Some(model) = get("MODEL") {
            config.generation.model = model;
        }
        config.generation.base_url = get("BASE_URL");
        config.generation.api_key = get("API_KEY").or_else(|| {
            lookup("API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        });
        if let Some(secs) = get("TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.generation.timeout_secs = secs;
        }
        if let Some(temperature) = get("TEMPERATURE").and_then(|v| v.parse().ok()) {
            config.generation.temperature = temperature;
        }

        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            config.server.port = port;
        }
        if let Some(dir) = get("STATIC_DIR") {
            config.server.static_dir = PathBuf::from(dir);
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.conversation.title_max_chars == 0 {
            return Err(ChatError::InvalidConfig(
                "conversation.title_max_chars must be > 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ChatError::InvalidConfig(
                "server.port must be > 0".to_string(),
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(ChatError::InvalidConfig(
                "generation.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.generation.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "generation.model must not be empty".to_string(),
            ));
        }

        if self.storage.slot.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.slot must not be empty".to_string(),
            ));
        }

        if let Some(base_url) = &self.generation.base_url {
            Url::parse(base_url)?;
        }

        if self.generation.provider == GenerationProvider::Gemini
            && self.generation.api_key.is_none()
        {
            return Err(ChatError::MissingApiKey("gemini".to_string()));
        }

        Ok(())
    }
}

/// Where the session collection is persisted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// A single JSON file.
    JsonFile,
    /// A key/value row in a `SQLite` database.
    Sqlite,
}

/// Persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selector.
    pub backend: StorageBackend,
    /// File path of the JSON document or `SQLite` database.
    pub path: PathBuf,
    /// Name of the slot holding the collection.
    pub slot: String,
}

impl StorageConfig {
    /// Default JSON file path.
    pub const DEFAULT_JSON_PATH: &'static str = "webhub_chats.json";
    /// Default `SQLite` database path.
    pub const DEFAULT_SQLITE_PATH: &'static str = "webhub_chats.sqlite";
    /// Default slot name.
    pub const DEFAULT_SLOT: &'static str = "webhub_final_chats";
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::JsonFile,
            path: PathBuf::from(Self::DEFAULT_JSON_PATH),
            slot: Self::DEFAULT_SLOT.to_string(),
        }
    }
}

/// Text-generation provider selector.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    /// Google Gemini REST API.
    Gemini,
    /// Local Ollama server through Rig.
    Ollama,
}

/// Generation provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider selector.
    pub provider: GenerationProvider,
    /// Model name understood by the provider.
    pub model: String,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// API key for hosted providers. Never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Gemini,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
            temperature: 0.7,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Conversation behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Placeholder title for new sessions.
    pub default_title: String,
    /// Characters of the first user message kept as the title.
    pub title_max_chars: usize,
    /// Persona instruction sent with every request.
    pub system_instruction: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_SESSION_TITLE.to_string(),
            title_max_chars: 25,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory of static frontend assets.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::server::DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
        }
    }
}
