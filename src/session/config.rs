use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for call sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Display name sent to the backend when a call starts
    pub display_name: String,

    /// Routing metadata for speech submissions, passed through untouched
    pub from: String,
    pub to: String,

    /// Interval between event-stream keepalive pings
    /// Default: none
    pub keepalive: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: "Trader".to_string(),
            from: "+1234567890".to_string(),
            to: "+0987654321".to_string(),
            keepalive: None,
        }
    }
}
