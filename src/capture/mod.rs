//! Speech capture
//!
//! - `SpeechRecognizer`: the engine contract (start/stop, growing result windows)
//! - `SpeechCaptureAdapter`: turns result windows into `CaptureEvent`s
//! - `ConsoleRecognizer`: stdin-backed engine for the CLI

mod adapter;
mod console;
mod recognizer;

pub use adapter::{CaptureEvent, SpeechCaptureAdapter};
pub use console::ConsoleRecognizer;
pub use recognizer::{RecognitionSegment, RecognizerConfig, RecognizerEvent, SpeechRecognizer};
