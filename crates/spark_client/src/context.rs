//! Sliding-window conversation transcript.
//!
//! The service caps the combined turn content, so before every request the
//! window evicts whole turns from the front (oldest first) until the
//! character budget holds. Turn content is never truncated.

use log::{debug, info};
use spark_core::{LanguageProfile, Role, Turn};

#[derive(Debug, Clone)]
pub struct ContextWindow {
    turns: Vec<Turn>,
    max_chars: usize,
    prompt_prefix: Option<String>,
}

impl ContextWindow {
    pub fn new(language: LanguageProfile, prompt_prefix: Option<String>) -> Self {
        Self {
            turns: Vec::new(),
            max_chars: language.max_chars(),
            prompt_prefix: prompt_prefix.filter(|p| !p.is_empty()),
        }
    }

    /// Append a turn. A configured prompt prefix is prepended to the very
    /// first stored turn of the session, never to later ones.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        let mut content = content.into();
        if self.turns.is_empty() {
            if let Some(prefix) = &self.prompt_prefix {
                content = format!("{prefix}{content}");
            }
        }
        self.turns.push(Turn::new(role, content));
    }

    /// Evict oldest turns until the budget holds or a single turn remains.
    ///
    /// A lone turn longer than the budget stays in place; it cannot be
    /// reduced below one turn.
    pub fn trim(&mut self) -> &[Turn] {
        debug!(
            "Trimming transcript, language budget is {} chars, current length {}",
            self.max_chars,
            self.total_chars()
        );
        while self.total_chars() > self.max_chars && self.turns.len() > 1 {
            let evicted = self.turns.remove(0);
            info!(
                "Transcript over budget, evicting oldest turn ({} chars)",
                evicted.char_len()
            );
        }
        &self.turns
    }

    /// Combined content length of all turns, in characters.
    pub fn total_chars(&self) -> usize {
        self.turns.iter().map(Turn::char_len).sum()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Clear the transcript for a fresh multi-turn conversation. The next
    /// appended turn receives the prompt prefix again.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Change the budget when the language profile changes mid-process.
    pub fn set_language(&mut self, language: LanguageProfile) {
        self.max_chars = language.max_chars();
    }

    #[cfg(test)]
    fn with_budget(max_chars: usize, prompt_prefix: Option<String>) -> Self {
        Self {
            turns: Vec::new(),
            max_chars,
            prompt_prefix,
        }
    }
}
