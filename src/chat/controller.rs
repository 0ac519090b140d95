//! Send-message workflow.
//!
//! A send appends the user message, releases the store, awaits the
//! generator, then appends the reply (or a fallback) to the session that was
//! current when the send started. Only one send is in flight at a time.
//!
//! A send future dropped part-way (client disconnect, caller timeout, task
//! abort) still returns the controller to idle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::chat::core::ids::SessionId;
use crate::chat::core::message::{Message, Sender, now_millis};
use crate::chat::generation::{
    EMPTY_REPLY_TEXT, FallbackResponses, GenerationRequest, TextGenerator,
};
use crate::chat::session_store::SessionStore;

/// Store handle shared between the controller and readers.
pub type SharedSessionStore = Arc<RwLock<SessionStore>>;

/// Whether a reply is being awaited.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerStatus {
    /// Ready to accept a send.
    #[default]
    Idle,
    /// A generation call is in flight.
    AwaitingResponse,
}

/// Why a send was refused.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Input was empty after trimming.
    BlankInput,
    /// Another send is still awaiting its reply.
    AwaitingResponse,
    /// No session is selected.
    NoCurrentSession,
}

impl RejectReason {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlankInput => "blank_input",
            Self::AwaitingResponse => "awaiting_response",
            Self::NoCurrentSession => "no_current_session",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the assistant text came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// The generator's own text.
    Generated,
    /// The generator succeeded with blank text; the apology was used.
    EmptyReply,
    /// The generator failed; a canned fallback was used.
    Fallback,
}

/// Result of an accepted send.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    /// Session the exchange belongs to.
    pub session_id: SessionId,
    /// The appended user message.
    pub user_message: Message,
    /// The assistant message.
    pub assistant_message: Message,
    /// Origin of the assistant text.
    pub source: ReplySource,
    /// `false` when the session was deleted before the reply arrived.
    pub appended: bool,
}

/// Outcome of [`ConversationController::send`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /// Nothing happened.
    Rejected(RejectReason),
    /// The exchange completed.
    Replied(Box<Reply>),
}

/// Drives sends against the shared store and a generator.
pub struct ConversationController {
    store: SharedSessionStore,
    generator: Arc<dyn TextGenerator>,
    fallbacks: FallbackResponses,
    request: GenerationRequest,
    awaiting: AtomicBool,
    input: Mutex<String>,
}

/// Clears the awaiting flag when dropped.
struct AwaitingGuard<'a>(&'a AtomicBool);

impl Drop for AwaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ConversationController {
    /// Create a controller with the default fallback replies.
    #[must_use]
    pub fn new(
        store: SharedSessionStore,
        generator: Arc<dyn TextGenerator>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            fallbacks: FallbackResponses::default(),
            request: GenerationRequest::new(system_instruction),
            awaiting: AtomicBool::new(false),
            input: Mutex::new(String::new()),
        }
    }

    /// Replace the fallback replies.
    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: FallbackResponses) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Shared store handle.
    #[must_use]
    pub const fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Fallback replies in use.
    #[must_use]
    pub const fn fallbacks(&self) -> &FallbackResponses {
        &self.fallbacks
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        if self.awaiting.load(Ordering::SeqCst) {
            ControllerStatus::AwaitingResponse
        } else {
            ControllerStatus::Idle
        }
    }

    /// Label of the generator in use.
    #[must_use]
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Replace the pending input buffer.
    pub async fn set_input(&self, text: impl Into<String>) {
        *self.input.lock().await = text.into();
    }

    /// Pending input buffer contents.
    pub async fn input(&self) -> String {
        self.input.lock().await.clone()
    }

    /// Send the pending input buffer.
    pub async fn submit(&self) -> SendOutcome {
        let text = self.input().await;
        self.send(&text).await
    }

    /// Send `text` to the current session and append the reply.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let (awaiting, session_id, user_message) = match self.begin(text).await {
            Ok(started) => started,
            Err(reason) => {
                debug!("Send rejected: {reason}");
                return SendOutcome::Rejected(reason);
            }
        };

        let (reply_text, source) = match self.generator.generate(text, &self.request).await {
            Ok(reply) if reply.trim().is_empty() => {
                warn!("{} returned an empty reply", self.generator.name());
                (EMPTY_REPLY_TEXT.to_string(), ReplySource::EmptyReply)
            }
            Ok(reply) => (reply, ReplySource::Generated),
            Err(err) => {
                warn!("{} generation failed: {err}", self.generator.name());
                (self.fallbacks.pick().to_string(), ReplySource::Fallback)
            }
        };

        let (assistant_message, appended) = {
            let mut store = self.store.write().await;
            let timestamp = store
                .session(session_id)
                .map_or_else(now_millis, |s| s.next_timestamp());
            let message = Message::new(Sender::Assistant, reply_text, timestamp);
            let appended = store.append_message(session_id, message.clone()).await;
            (message, appended)
        };
        if !appended {
            info!("Session {session_id} was deleted while awaiting; reply discarded");
        }

        drop(awaiting);

        SendOutcome::Replied(Box::new(Reply {
            session_id,
            user_message,
            assistant_message,
            source,
            appended,
        }))
    }

    /// Gate and record the user side of a send.
    ///
    /// The awaiting flag is only checked and raised under the store write
    /// lock, so two concurrent sends cannot both pass. The returned guard
    /// lowers it again.
    async fn begin(
        &self,
        text: &str,
    ) -> Result<(AwaitingGuard<'_>, SessionId, Message), RejectReason> {
        if text.trim().is_empty() {
            return Err(RejectReason::BlankInput);
        }

        let mut store = self.store.write().await;
        if self.awaiting.load(Ordering::SeqCst) {
            return Err(RejectReason::AwaitingResponse);
        }
        let Some(session) = store.current_session() else {
            return Err(RejectReason::NoCurrentSession);
        };
        let session_id = session.id;
        let message = Message::new(Sender::User, text, session.next_timestamp());

        self.awaiting.store(true, Ordering::SeqCst);
        let guard = AwaitingGuard(&self.awaiting);
        store.append_message(session_id, message.clone()).await;
        drop(store);

        self.input.lock().await.clear();
        Ok((guard, session_id, message))
    }
}
