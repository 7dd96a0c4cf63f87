use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Identifier of a turn, unique within a [`super::TranscriptLog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub u64);

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Map a speaker tag from the event stream.
    ///
    /// Only `"user"` denotes the local caller; every other tag (`"bot"`,
    /// `"assistant"`, missing) is the assistant.
    pub fn from_wire(tag: Option<&str>) -> Self {
        match tag {
            Some("user") => Speaker::User,
            _ => Speaker::Assistant,
        }
    }
}

/// A speaker/text pair waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptItem {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptItem {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// One immutable dialogue turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub id: TurnId,

    pub speaker: Speaker,

    /// Non-empty content
    pub text: String,

    /// When the turn was captured; display only, never used for ordering
    pub captured_at: DateTime<Local>,
}

impl TranscriptTurn {
    /// Wall-clock time for display next to the turn
    pub fn display_time(&self) -> String {
        self.captured_at.format("%H:%M:%S").to_string()
    }
}
