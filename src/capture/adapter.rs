use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::recognizer::{RecognitionSegment, RecognizerEvent, SpeechRecognizer};
use crate::error::CaptureError;

/// Typed output of a [`SpeechCaptureAdapter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Provisional text for the utterance in progress (preview only)
    Interim(String),
    /// Finalized text; emitted exactly once per finalized segment run
    Final(String),
    Started,
    Stopped,
    Failed(String),
}

/// Wraps an optional continuous recognizer and turns its result windows into
/// [`CaptureEvent`]s.
///
/// The recognizer is capability-detected once: an adapter built without one
/// reports [`CaptureError::Unavailable`] on every `start`.
pub struct SpeechCaptureAdapter {
    recognizer: Option<Box<dyn SpeechRecognizer>>,

    /// Whether the recognizer is currently listening
    is_listening: Arc<AtomicBool>,

    /// Sender for the current run, kept so `stop` can emit `Stopped`
    events: Option<mpsc::UnboundedSender<CaptureEvent>>,

    /// Handle for the result translation task
    task: Option<JoinHandle<()>>,
}

impl SpeechCaptureAdapter {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>) -> Self {
        match &recognizer {
            Some(recognizer) => info!("Speech capture using {} recognizer", recognizer.name()),
            None => warn!("Speech recognition not supported: no recognizer installed"),
        }

        Self {
            recognizer,
            is_listening: Arc::new(AtomicBool::new(false)),
            events: None,
            task: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Begin continuous listening.
    ///
    /// The returned receiver yields `Started` first, then text events, and
    /// `Stopped` last. Starting while already listening restarts the run.
    pub async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<CaptureEvent>, CaptureError> {
        if self.recognizer.is_none() {
            return Err(CaptureError::Unavailable);
        }

        if self.is_listening() {
            debug!("Capture already running, restarting");
            self.stop().await;
        }

        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or(CaptureError::Unavailable)?;

        let raw_rx = recognizer.start().await?;
        let engine = recognizer.name().to_string();

        let (tx, rx) = mpsc::unbounded_channel();
        self.is_listening.store(true, Ordering::SeqCst);
        let _ = tx.send(CaptureEvent::Started);

        info!("Speech capture started ({})", engine);

        let task = tokio::spawn(translate(
            raw_rx,
            tx.clone(),
            Arc::clone(&self.is_listening),
            engine,
        ));

        self.events = Some(tx);
        self.task = Some(task);

        Ok(rx)
    }

    /// Stop listening. Safe to call when not running.
    ///
    /// No events from the stopped run are delivered after this returns,
    /// except the final `Stopped`.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        if self.is_listening.swap(false, Ordering::SeqCst) {
            if let Some(recognizer) = self.recognizer.as_mut() {
                if let Err(e) = recognizer.stop().await {
                    warn!("Recognizer {} failed to stop cleanly: {}", recognizer.name(), e);
                }
            }

            if let Some(events) = &self.events {
                let _ = events.send(CaptureEvent::Stopped);
            }

            info!("Speech capture stopped");
        }

        self.events = None;
    }
}

/// Classify the entries that changed in a result window.
///
/// Entries before `result_index` were reported by earlier callbacks and are
/// never looked at again, so a finalized entry yields exactly one `Final`.
/// Finalized entries win over interim ones.
pub(crate) fn classify(
    result_index: usize,
    results: &[RecognitionSegment],
) -> Option<CaptureEvent> {
    let mut final_text = String::new();
    let mut interim_text = String::new();

    for segment in results.iter().skip(result_index) {
        if segment.is_final {
            final_text.push_str(&segment.transcript);
        } else {
            interim_text.push_str(&segment.transcript);
        }
    }

    if !final_text.trim().is_empty() {
        Some(CaptureEvent::Final(final_text))
    } else if !interim_text.trim().is_empty() {
        Some(CaptureEvent::Interim(interim_text))
    } else {
        None
    }
}

async fn translate(
    mut raw_rx: mpsc::Receiver<RecognizerEvent>,
    tx: mpsc::UnboundedSender<CaptureEvent>,
    is_listening: Arc<AtomicBool>,
    engine: String,
) {
    while let Some(event) = raw_rx.recv().await {
        match event {
            RecognizerEvent::Result {
                result_index,
                results,
            } => {
                if let Some(event) = classify(result_index, &results) {
                    debug!("Capture event from {}: {:?}", engine, event);
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
            RecognizerEvent::Error(reason) => {
                warn!("Speech recognition error ({}): {}", engine, reason);
                let _ = tx.send(CaptureEvent::Failed(reason));
                break;
            }
            RecognizerEvent::End => {
                info!("Recognizer {} ended", engine);
                break;
            }
        }
    }

    if is_listening.swap(false, Ordering::SeqCst) {
        let _ = tx.send(CaptureEvent::Stopped);
    }
}
