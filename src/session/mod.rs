//! Call session management
//!
//! This module provides the `CallSessionController` abstraction that manages:
//! - Session lifecycle (idle, starting, active, ending)
//! - The per-session event stream
//! - Speech capture and forwarding of recognized text
//! - The live transcript and the published call snapshot

mod config;
mod controller;
mod state;

pub use config::SessionConfig;
pub use controller::CallSessionController;
pub use state::{CallSnapshot, CallStatus, Lifecycle};
