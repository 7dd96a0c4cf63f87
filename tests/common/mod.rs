// Shared test doubles for the call client
//
// In-memory stand-ins for the backend, the event stream and the speech
// engine, so controller behavior can be driven step by step.

#![allow(dead_code)]

use goq_client::{
    BackendError, CallBackend, CallSessionController, CallSnapshot, CaptureError, ChannelError,
    EventStream, EventStreamConnector, RecognitionSegment, RecognizerEvent, SessionConfig,
    SpeechAck, SpeechRecognizer, SpeechSubmission,
};
use goq_client::backend::{CreateCallResponse, EndCallAck};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};

pub const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
pub struct MockBackend {
    session_ids: Mutex<VecDeque<String>>,
    next_id: AtomicUsize,
    pub created: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<(String, SpeechSubmission)>>,
    pub ended: Mutex<Vec<String>>,
    pub fail_create: AtomicBool,
    pub fail_submit: AtomicBool,
    /// When set, each create waits for a permit
    create_gate: Option<Semaphore>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out these session ids first, in order
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            session_ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Creates block until [`MockBackend::release_create`] is called
    pub fn gated(ids: &[&str]) -> Self {
        Self {
            create_gate: Some(Semaphore::new(0)),
            ..Self::with_ids(ids)
        }
    }

    pub fn release_create(&self) {
        if let Some(gate) = &self.create_gate {
            gate.add_permits(1);
        }
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<(String, SpeechSubmission)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn ended(&self) -> Vec<String> {
        self.ended.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CallBackend for MockBackend {
    async fn create_call(&self, display_name: &str) -> Result<CreateCallResponse, BackendError> {
        self.created.lock().unwrap().push(display_name.to_string());

        if let Some(gate) = &self.create_gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::Status(500));
        }

        let session_id = self.session_ids.lock().unwrap().pop_front().unwrap_or_else(|| {
            format!("session-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        });

        Ok(CreateCallResponse {
            session_id,
            message: Some("Call started".to_string()),
            status: Some("active".to_string()),
        })
    }

    async fn submit_speech(
        &self,
        session_id: &str,
        speech: &SpeechSubmission,
    ) -> Result<SpeechAck, BackendError> {
        self.submitted
            .lock()
            .unwrap()
            .push((session_id.to_string(), speech.clone()));

        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(BackendError::Status(500));
        }

        Ok(SpeechAck {
            status: "processed".to_string(),
            response: Some(format!("You said: {}", speech.text)),
        })
    }

    async fn end_call(&self, session_id: &str) -> Result<EndCallAck, BackendError> {
        self.ended.lock().unwrap().push(session_id.to_string());
        Ok(EndCallAck::default())
    }
}

// ============================================================================
// Event stream
// ============================================================================

/// Server side of one in-memory event stream
pub struct MockPeer {
    pub session_id: String,
    tx: Mutex<Option<mpsc::UnboundedSender<Result<String, ChannelError>>>>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    pub fn push(&self, payload: impl Into<String>) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(payload.into()));
        }
    }

    pub fn push_json(&self, value: serde_json::Value) {
        self.push(value.to_string());
    }

    /// Fail the stream with a transport error
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(Err(ChannelError::Stream(reason.to_string())));
        }
    }

    /// Close from the server side
    pub fn hang_up(&self) {
        self.tx.lock().unwrap().take();
    }

    /// Whether the client has let go of its end
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Payloads the client sent
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<Result<String, ChannelError>>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl EventStream for MockStream {
    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        self.rx.recv().await
    }

    async fn send(&mut self, payload: String) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockConnector {
    peers: Mutex<Vec<Arc<MockPeer>>>,
    pub fail_connect: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    /// Streams the client has not closed yet
    pub fn live_count(&self) -> usize {
        self.peers
            .lock()
            .unwrap()
            .iter()
            .filter(|peer| !peer.is_closed())
            .count()
    }

    /// Wait until the `index`-th connection has been made
    pub async fn peer(&self, index: usize) -> Arc<MockPeer> {
        let connector = self;
        eventually(|| connector.open_count() > index).await;
        Arc::clone(&self.peers.lock().unwrap()[index])
    }
}

#[async_trait::async_trait]
impl EventStreamConnector for MockConnector {
    async fn connect(&self, session_id: &str) -> Result<Box<dyn EventStream>, ChannelError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        self.peers.lock().unwrap().push(Arc::new(MockPeer {
            session_id: session_id.to_string(),
            tx: Mutex::new(Some(tx)),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        }));

        Ok(Box::new(MockStream { rx, sent, closed }))
    }
}

// ============================================================================
// Speech engine
// ============================================================================

#[derive(Default)]
struct RecognizerInner {
    tx: Option<mpsc::Sender<RecognizerEvent>>,
    /// Result window of the current utterance run
    window: Vec<RecognitionSegment>,
    starts: usize,
    stops: usize,
}

/// Drives a [`ScriptedRecognizer`] from the test body
#[derive(Clone, Default)]
pub struct RecognizerHandle {
    inner: Arc<Mutex<RecognizerInner>>,
}

impl RecognizerHandle {
    fn emit(&self, event: RecognizerEvent) {
        let tx = self.inner.lock().unwrap().tx.clone();
        if let Some(tx) = tx {
            let _ = tx.try_send(event);
        }
    }

    /// Report provisional text for the utterance in progress
    pub fn interim(&self, text: &str) {
        let event = {
            let inner = self.inner.lock().unwrap();
            let mut results = inner.window.clone();
            results.push(RecognitionSegment::interim(text));
            RecognizerEvent::Result {
                result_index: inner.window.len(),
                results,
            }
        };
        self.emit(event);
    }

    /// Finalize an utterance; the window grows like a real engine's
    pub fn finalize(&self, text: &str) {
        let event = {
            let mut inner = self.inner.lock().unwrap();
            inner.window.push(RecognitionSegment::finalized(text));
            RecognizerEvent::Result {
                result_index: inner.window.len() - 1,
                results: inner.window.clone(),
            }
        };
        self.emit(event);
    }

    /// Start a new result window, as engines that report one window per
    /// utterance do
    pub fn fresh_window(&self) {
        self.inner.lock().unwrap().window.clear();
    }

    pub fn error(&self, reason: &str) {
        self.emit(RecognizerEvent::Error(reason.to_string()));
    }

    pub fn starts(&self) -> usize {
        self.inner.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().unwrap().stops
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().tx.is_some()
    }
}

pub struct ScriptedRecognizer {
    handle: RecognizerHandle,
}

impl ScriptedRecognizer {
    pub fn new() -> (Self, RecognizerHandle) {
        let handle = RecognizerHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>, CaptureError> {
        let (tx, rx) = mpsc::channel(32);
        let mut inner = self.handle.inner.lock().unwrap();
        inner.tx = Some(tx);
        inner.window.clear();
        inner.starts += 1;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let mut inner = self.handle.inner.lock().unwrap();
        inner.tx = None;
        inner.stops += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: CallSessionController,
    pub backend: Arc<MockBackend>,
    pub connector: Arc<MockConnector>,
    pub recognizer: RecognizerHandle,
    pub snapshots: watch::Receiver<CallSnapshot>,
}

/// Controller with a scripted recognizer installed
pub fn harness(backend: MockBackend) -> Harness {
    build(backend, SessionConfig::default(), true)
}

/// Controller on a host without speech recognition
pub fn harness_without_capture(backend: MockBackend) -> Harness {
    build(backend, SessionConfig::default(), false)
}

pub fn harness_with_config(backend: MockBackend, config: SessionConfig) -> Harness {
    build(backend, config, true)
}

fn build(backend: MockBackend, config: SessionConfig, with_capture: bool) -> Harness {
    let backend = Arc::new(backend);
    let connector = Arc::new(MockConnector::new());

    let (recognizer, handle) = ScriptedRecognizer::new();
    let recognizer: Option<Box<dyn SpeechRecognizer>> = if with_capture {
        Some(Box::new(recognizer))
    } else {
        None
    };

    let controller = CallSessionController::new(
        config,
        Arc::clone(&backend) as Arc<dyn CallBackend>,
        Arc::clone(&connector) as Arc<dyn EventStreamConnector>,
        recognizer,
    );
    let snapshots = controller.subscribe();

    Harness {
        controller,
        backend,
        connector,
        recognizer: handle,
        snapshots,
    }
}

impl Harness {
    /// Start a call and wait until its event stream is connected
    pub async fn start_connected(&mut self) -> (String, Arc<MockPeer>) {
        let index = self.connector.open_count();
        let session_id = self
            .controller
            .start_call("Trader")
            .await
            .expect("start_call failed");
        let peer = self.connector.peer(index).await;
        wait_for(&mut self.snapshots, |s| {
            s.status.connection == goq_client::ConnectionState::Connected
        })
        .await;
        (session_id, peer)
    }
}

// ============================================================================
// Waiting
// ============================================================================

/// Wait for a published snapshot matching `predicate`
pub async fn wait_for(
    snapshots: &mut watch::Receiver<CallSnapshot>,
    predicate: impl FnMut(&CallSnapshot) -> bool,
) -> CallSnapshot {
    tokio::time::timeout(WAIT, snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("controller dropped")
        .clone()
}

/// Poll `check` until it holds
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Let spawned tasks run for a moment
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
