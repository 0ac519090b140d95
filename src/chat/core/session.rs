//! Session model: one titled, append-only conversation thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::SessionId;
use crate::chat::core::message::{Message, now_millis};

/// A conversation thread.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique, never reused.
    pub id: SessionId,
    /// Placeholder until the first user message arrives.
    pub title: String,
    /// Ordered, append-only.
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session carrying the placeholder title.
    #[must_use]
    pub fn new(placeholder_title: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            title: placeholder_title.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message, applying the first-message title rule.
    ///
    /// When the session is empty, the title becomes the first
    /// `title_max_chars` characters of the message text.
    pub fn push(&mut self, message: Message, title_max_chars: usize) {
        if self.messages.is_empty() {
            self.title = derive_title(&message.text, title_max_chars);
        }
        self.messages.push(message);
    }

    /// Timestamp for the next message: now, but never earlier than the last one.
    #[must_use]
    pub fn next_timestamp(&self) -> DateTime<Utc> {
        let now = now_millis();
        self.messages
            .last()
            .map_or(now, |last| now.max(last.timestamp))
    }

    /// Sidebar projection.
    #[must_use]
    pub fn summary(&self, is_current: bool) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone(),
            message_count: self.messages.len(),
            is_current,
        }
    }
}

/// Leading `max_chars` characters of `text`, no ellipsis.
#[must_use]
pub fn derive_title(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Metadata for a session displayed in a sidebar.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// Number of messages in the session.
    pub message_count: usize,
    /// Whether this is the current session.
    pub is_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::message::Sender;

    #[test]
    fn test_first_user_message_sets_title() {
        let mut session = Session::new("New chat");
        session.push(
            Message::user("How do I parse JSON in a streaming fashion?"),
            25,
        );
        assert_eq!(session.title, "How do I parse JSON in a ");
        assert_eq!(session.title.chars().count(), 25);
    }

    #[test]
    fn test_later_messages_keep_title() {
        let mut session = Session::new("New chat");
        session.push(Message::user("hello"), 25);
        session.push(Message::assistant("hi there"), 25);
        session.push(Message::user("something else entirely"), 25);
        assert_eq!(session.title, "hello");
        assert_eq!(session.messages.len(), 3);
    }

    #[test]
    fn test_short_text_used_whole() {
        let mut session = Session::new("New chat");
        session.push(Message::user("hey"), 25);
        assert_eq!(session.title, "hey");
    }

    #[test]
    fn test_first_message_titles_regardless_of_sender() {
        let mut session = Session::new("New chat");
        session.push(Message::assistant("welcome"), 25);
        assert_eq!(session.title, "welcome");
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let title = derive_title("Ўзбекистон ҳақида маълумот беринг", 10);
        assert_eq!(title, "Ўзбекистон");
    }

    #[test]
    fn test_next_timestamp_is_non_decreasing() {
        let mut session = Session::new("t");
        let future = Utc::now() + chrono::Duration::hours(1);
        session.push(Message::new(Sender::User, "a", future), 25);
        assert!(session.next_timestamp() >= session.messages[0].timestamp);
    }

    #[test]
    fn test_summary() {
        let mut session = Session::new("t");
        session.push(Message::user("abc"), 25);
        let summary = session.summary(true);
        assert_eq!(summary.id, session.id);
        assert_eq!(summary.title, "abc");
        assert_eq!(summary.message_count, 1);
        assert!(summary.is_current);
    }
}
