use thiserror::Error;

use crate::session::Lifecycle;

/// Failure talking to the call backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// The backend refused or failed to create a call
#[derive(Debug, Error)]
#[error("Failed to start call: {0}")]
pub struct StartError(#[from] pub BackendError);

/// Forwarding recognized speech to the backend failed
#[derive(Debug, Error)]
#[error("Failed to send voice input: {0}")]
pub struct SubmitError(#[from] pub BackendError);

/// Event stream failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("WebSocket connection error: {0}")]
    Connect(String),

    #[error("WebSocket connection error: {0}")]
    Stream(String),
}

/// Speech capture failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Speech recognition not supported")]
    Unavailable,

    #[error("Speech recognition error: {0}")]
    Engine(String),
}

/// Errors returned by [`crate::CallSessionController`] operations
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("a call start is already in progress")]
    StartInProgress,

    #[error("the current call is still ending")]
    EndInProgress,

    #[error("call start was cancelled before it completed")]
    StartCancelled,

    #[error("no active call (state: {0:?})")]
    NotActive(Lifecycle),
}
