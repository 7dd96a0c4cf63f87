use tokio::sync::mpsc;

use crate::error::CaptureError;

/// One entry of a recognizer's result window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    /// Best transcript for this entry
    pub transcript: String,
    /// Whether the engine has finalized this entry
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn finalized(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Notification from a continuous speech recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// The engine's current result window.
    ///
    /// `result_index` is the first entry that changed since the previous
    /// callback; entries before it are never reported again. An engine may
    /// grow one window across utterances or start a fresh window (with
    /// `result_index` 0) for each one.
    Result {
        result_index: usize,
        results: Vec<RecognitionSegment>,
    },
    /// Engine error; the engine stops listening
    Error(String),
    /// Engine stopped listening on its own
    End,
}

/// Recognizer settings
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// BCP-47 language tag
    pub lang: String,
    /// Keep listening across utterances; otherwise end after the first
    pub continuous: bool,
    /// Report interim results before finalizing
    pub interim_results: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

/// Continuous speech-to-text engine
///
/// Implementations:
/// - `ConsoleRecognizer`: each stdin line is one utterance
/// - test doubles driven by a script
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin listening
    ///
    /// Returns a channel receiver that will receive recognizer events
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, CaptureError>;

    /// Stop listening
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}
