use serde::{Deserialize, Serialize};

/// Body of `POST /start_call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallRequest {
    pub user_name: String,
}

/// Response of `POST /start_call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Direction of a speech submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechDirection {
    /// Spoken by the local caller
    Inbound,
}

/// Body of `POST /bland_webhook/{session_id}`
///
/// `from` and `to` are opaque routing metadata; the client passes through
/// whatever the configuration supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSubmission {
    #[serde(rename = "from_")]
    pub from: String,
    pub to: String,
    pub text: String,
    pub direction: SpeechDirection,
}

/// Response of a speech submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechAck {
    pub status: String,
    /// Assistant reply, also pushed over the event stream
    #[serde(default)]
    pub response: Option<String>,
}

/// Response of `POST /end_call/{session_id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndCallAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub active_sessions: usize,
    #[serde(default)]
    pub active_connections: usize,
}
