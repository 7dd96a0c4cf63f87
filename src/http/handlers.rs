use super::state::AppState;
use crate::error::CallError;
use crate::session::CallStatus;
use crate::transcript::TranscriptTurn;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartCallRequest {
    /// Overrides the configured display name
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EndCallResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleCaptureResponse {
    pub listening: bool,
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub status: String,
    /// Assistant reply, when the backend returned one
    pub response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn call_error_response(e: CallError) -> Response {
    let status = match &e {
        CallError::Start(_) | CallError::Submit(_) => StatusCode::BAD_GATEWAY,
        CallError::StartInProgress
        | CallError::EndInProgress
        | CallError::StartCancelled
        | CallError::NotActive(_) => StatusCode::CONFLICT,
        CallError::Capture(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /call/start
/// Start a new call
pub async fn start_call(
    State(state): State<AppState>,
    Json(req): Json<StartCallRequest>,
) -> impl IntoResponse {
    let display_name = req
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| state.controller.config().display_name.clone());

    match state.controller.start_call(&display_name).await {
        Ok(session_id) => {
            info!("Call started via HTTP: {}", session_id);
            (
                StatusCode::OK,
                Json(StartCallResponse {
                    session_id: session_id.clone(),
                    status: "active".to_string(),
                    message: format!("Call started for {}", display_name),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start call: {}", e);
            call_error_response(e)
        }
    }
}

/// POST /call/end
/// End the current call (no-op when idle)
pub async fn end_call(State(state): State<AppState>) -> impl IntoResponse {
    let ended = state.controller.end_call().await;

    let (status, message) = if ended {
        ("ended", "Call ended")
    } else {
        ("idle", "No active call")
    };

    (
        StatusCode::OK,
        Json(EndCallResponse {
            status: status.to_string(),
            message: message.to_string(),
        }),
    )
}

/// POST /capture/toggle
/// Start or stop speech capture
pub async fn toggle_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.toggle_capture().await {
        Ok(listening) => {
            (StatusCode::OK, Json(ToggleCaptureResponse { listening })).into_response()
        }
        Err(e) => call_error_response(e),
    }
}

/// POST /speech
/// Submit text as recognized speech
pub async fn submit_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> impl IntoResponse {
    match state.controller.submit_voice_text(&req.text).await {
        Ok(Some(ack)) => (
            StatusCode::OK,
            Json(SpeechResponse {
                status: ack.status,
                response: ack.response,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::ACCEPTED,
            Json(SpeechResponse {
                status: "ignored".to_string(),
                response: None,
            }),
        )
            .into_response(),
        Err(e) => call_error_response(e),
    }
}

/// GET /call/status
/// Get call status
pub async fn get_call_status(State(state): State<AppState>) -> Json<CallStatus> {
    Json(state.controller.status().await)
}

/// GET /call/transcript
/// Get the transcript accumulated so far
pub async fn get_call_transcript(State(state): State<AppState>) -> Json<Vec<TranscriptTurn>> {
    Json(state.controller.transcript().await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
