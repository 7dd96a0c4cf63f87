use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::recognizer::{RecognitionSegment, RecognizerConfig, RecognizerEvent, SpeechRecognizer};
use crate::error::CaptureError;

/// Recognizer that treats each line typed on stdin as one spoken utterance.
///
/// Every line is its own result window, reported first as an interim entry
/// and then finalized. One reader owns stdin for the recognizer's lifetime;
/// `start` and `stop` only arm and disarm forwarding from it, so restarting
/// capture never loses a line to an abandoned read.
pub struct ConsoleRecognizer {
    config: RecognizerConfig,

    /// Lines from the reader, shared by successive runs
    lines: Arc<Mutex<mpsc::UnboundedReceiver<std::io::Result<String>>>>,

    /// Forwarding task of the current run
    forwarder: Option<JoinHandle<()>>,
}

impl ConsoleRecognizer {
    /// Read utterances from stdin on a dedicated thread
    pub fn new(config: RecognizerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let spawned = std::thread::Builder::new()
            .name("console-recognizer".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to start stdin reader: {}", e);
        }

        Self::from_lines(config, rx)
    }

    /// Read utterances from an existing line source
    pub fn from_lines(
        config: RecognizerConfig,
        lines: mpsc::UnboundedReceiver<std::io::Result<String>>,
    ) -> Self {
        Self {
            config,
            lines: Arc::new(Mutex::new(lines)),
            forwarder: None,
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ConsoleRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, CaptureError> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        {
            // Waits for an aborted run to release the source.
            // Lines typed while capture was off were never heard.
            let mut lines = self.lines.lock().await;
            while lines.try_recv().is_ok() {}
        }

        info!(
            "Console recognizer listening (lang={}, interim={}, continuous={})",
            self.config.lang, self.config.interim_results, self.config.continuous
        );

        let (tx, rx) = mpsc::channel(32);
        let lines = Arc::clone(&self.lines);
        let interim_results = self.config.interim_results;
        let continuous = self.config.continuous;

        let forwarder = tokio::spawn(async move {
            let mut lines = lines.lock().await;

            loop {
                let line = match lines.recv().await {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        warn!("Failed to read stdin: {}", e);
                        let _ = tx.send(RecognizerEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        let _ = tx.send(RecognizerEvent::End).await;
                        break;
                    }
                };

                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                if interim_results {
                    let event = RecognizerEvent::Result {
                        result_index: 0,
                        results: vec![RecognitionSegment::interim(text)],
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }

                let event = RecognizerEvent::Result {
                    result_index: 0,
                    results: vec![RecognitionSegment::finalized(text)],
                };
                if tx.send(event).await.is_err() {
                    break;
                }

                if !continuous {
                    let _ = tx.send(RecognizerEvent::End).await;
                    break;
                }
            }
        });

        self.forwarder = Some(forwarder);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            info!("Console recognizer stopped");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
