//! Message types - one turn of a conversation transcript.
//!
//! The wire format is `{"role": "...", "content": "..."}`, shared between
//! the request payload and the local context window.

use serde::{Deserialize, Serialize};

/// Who produced a turn. The service tolerates consecutive same-role turns,
/// so alternation is not enforced anywhere.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the transcript.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Content length in characters, not bytes. The service budget is
    /// expressed in characters and most transcripts are CJK-heavy.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
