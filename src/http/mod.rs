//! Local HTTP control API
//!
//! This module lets a UI drive the call without linking the crate:
//! - POST /call/start - Start a call
//! - POST /call/end - End the call
//! - POST /capture/toggle - Start or stop speech capture
//! - POST /speech - Submit text as if it had been spoken
//! - GET /call/status - Query call status
//! - GET /call/transcript - Get the live transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
