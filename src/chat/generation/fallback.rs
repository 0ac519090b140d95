//! Canned replies used when generation fails.

use rand::Rng;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Reply substituted when the provider succeeds but returns blank text.
pub const EMPTY_REPLY_TEXT: &str = "Kechirasiz, xatolik yuz berdi.";

/// Default fallback replies.
const DEFAULT_FALLBACKS: [&str; 6] = [
    "Salom! Sizga qanday yordam bera olaman?",
    "Ajoyib savol! Buni amalga oshirish juda oson.",
    "Xabaringiz qabul qilindi. Men har doim yordam berishga tayyorman!",
    "Tushunarlik. Keling, bu mavzuni chuqurroq ko'rib chiqamiz.",
    "Fikringiz juda qiziq. Men hozirda ma'lumotlarni tahlil qilyapman...",
    "Yana qanday savollaringiz bor? Men xizmatingizdaman.",
];

/// A fixed, non-empty list of fallback replies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackResponses {
    responses: Vec<String>,
}

impl FallbackResponses {
    /// Build from a custom list.
    ///
    /// # Errors
    /// Returns an error if `responses` is empty.
    pub fn new(responses: Vec<String>) -> ChatResult<Self> {
        if responses.is_empty() {
            return Err(ChatError::InvalidConfig(
                "fallback responses must not be empty".to_string(),
            ));
        }
        Ok(Self { responses })
    }

    /// Pick one reply uniformly at random.
    #[must_use]
    pub fn pick(&self) -> &str {
        let mut rng = rand::thread_rng();
        let idx = rng.gen_range(0..self.responses.len());
        &self.responses[idx]
    }

    /// Whether `text` is one of the fallback replies.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.responses.iter().any(|r| r == text)
    }

    /// All replies in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.responses
    }
}

impl Default for FallbackResponses {
    fn default() -> Self {
        Self {
            responses: DEFAULT_FALLBACKS.iter().map(ToString::to_string).collect(),
        }
    }
}
