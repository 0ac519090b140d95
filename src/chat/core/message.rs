//! Message model for a single conversation turn.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the generation service, or a fallback in its place.
    ///
    /// Older exports tag these as `"ai"`.
    #[serde(alias = "ai")]
    Assistant,
}

impl Sender {
    /// Stable string form for storage and rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" | "ai" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// One immutable turn in a session.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, unique within its session.
    pub id: MessageId,
    /// Message body as typed or generated.
    pub text: String,
    /// Who wrote it.
    pub sender: Sender,
    /// Creation instant, millisecond precision.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message with an explicit timestamp.
    ///
    /// The timestamp is truncated to milliseconds so it survives persistence unchanged.
    #[must_use]
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            sender,
            timestamp: truncate_to_millis(timestamp),
        }
    }

    /// Build a user message stamped now.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, Utc::now())
    }

    /// Build an assistant message stamped now.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text, Utc::now())
    }

    /// Wall-clock `HH:MM` label in UTC.
    #[must_use]
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Current instant truncated to milliseconds.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_accepts_legacy_tag() {
        let sender: Sender = serde_json::from_str("\"ai\"").unwrap();
        assert_eq!(sender, Sender::Assistant);
        assert_eq!(serde_json::to_string(&sender).unwrap(), "\"assistant\"");
        assert_eq!("ai".parse::<Sender>(), Ok(Sender::Assistant));
    }

    #[test]
    fn test_timestamp_serialized_as_millis() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let message = Message::new(Sender::User, "hi", ts);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_123_i64);
        assert_eq!(json["sender"], "user");
    }

    #[test]
    fn test_new_truncates_sub_millisecond_precision() {
        let ts = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let message = Message::new(Sender::Assistant, "x", ts);
        assert_eq!(message.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(message.timestamp.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_time_label() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).single().unwrap();
        let message = Message::new(Sender::User, "x", ts);
        assert_eq!(message.time_label(), "09:05");
    }
}
