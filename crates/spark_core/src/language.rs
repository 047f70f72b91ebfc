//! Language profile - determines the transcript character budget.
//!
//! The service caps the combined `content` of all turns at 8192 tokens.
//! One token is roughly 1.5 Chinese characters or 0.8 English words, so the
//! usable character budget depends on what the transcript is made of.

use serde::{Deserialize, Serialize};

/// Expected makeup of the conversation text.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LanguageProfile {
    /// Pure Chinese text, ~12000 characters fit in the token cap.
    Chinese,
    /// Pure English text, ~6000 words at an average word length of 5.
    English,
    /// Mixed Chinese/English. 9000 is a conservative middle ground.
    #[default]
    Mixed,
}

impl LanguageProfile {
    /// Character budget for the whole transcript under this profile.
    pub fn max_chars(self) -> usize {
        match self {
            LanguageProfile::Chinese => 12_000,
            LanguageProfile::English => 6_000 * 5,
            LanguageProfile::Mixed => 9_000,
        }
    }
}
