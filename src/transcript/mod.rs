//! Transcript model
//!
//! An ordered log of user and assistant turns, appended in arrival order and
//! cleared when the call ends.

mod log;
mod turn;

pub use log::TranscriptLog;
pub use turn::{Speaker, TranscriptItem, TranscriptTurn, TurnId};
