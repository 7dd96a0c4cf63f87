use serde::{Deserialize, Serialize};

use crate::channel::ConnectionState;
use crate::transcript::TranscriptTurn;

/// Call lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Idle,
    Starting,
    Active,
    Ending,
}

/// Status of the call, without the transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallStatus {
    pub lifecycle: Lifecycle,

    /// Backend-assigned id, present while a call exists
    pub session_id: Option<String>,

    /// Event stream state
    pub connection: ConnectionState,

    /// Whether speech capture is running
    pub listening: bool,

    /// Whether a recognizer is installed at all
    pub capture_available: bool,

    /// Latest interim or final recognized text, until submitted
    pub voice_preview: Option<String>,

    /// Most recent user-visible error
    pub error: Option<String>,

    /// Number of turns in the transcript
    pub transcript_len: usize,
}

/// Render-side view of the call, published after every state change
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallSnapshot {
    pub status: CallStatus,
    pub transcript: Vec<TranscriptTurn>,
}

impl CallSnapshot {
    pub fn is_call_active(&self) -> bool {
        self.status.lifecycle == Lifecycle::Active
    }
}
