use super::config::SessionConfig;
use super::state::{CallSnapshot, CallStatus, Lifecycle};
use crate::backend::{CallBackend, SpeechAck, SpeechDirection, SpeechSubmission};
use crate::capture::{CaptureEvent, SpeechCaptureAdapter, SpeechRecognizer};
use crate::channel::{
    ChannelEvent, ConnectionState, EventStreamConnector, InboundEvent, SessionChannel,
};
use crate::error::{CallError, CaptureError, StartError, SubmitError};
use crate::transcript::{Speaker, TranscriptLog, TranscriptTurn};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

/// Owns one call session: its identity and lifecycle, the event stream,
/// speech capture and the transcript.
///
/// All state lives behind a single lock. Channel and capture events are fed
/// through one inbox and applied by one task in arrival order; callbacks
/// always read the locked state, never the published [`CallSnapshot`].
#[derive(Clone)]
pub struct CallSessionController {
    shared: Arc<Shared>,
}

struct Shared {
    /// Session configuration
    config: SessionConfig,

    /// Backend call API
    backend: Arc<dyn CallBackend>,

    /// Opens the per-session event stream
    connector: Arc<dyn EventStreamConnector>,

    /// Authoritative call state
    state: Mutex<CallState>,

    /// Render-side copy, refreshed after every mutation
    snapshot: watch::Sender<CallSnapshot>,

    /// Channel and capture events, applied in arrival order
    inbox: mpsc::UnboundedSender<Notice>,

    /// Speech submissions, forwarded one at a time in order
    submissions: mpsc::UnboundedSender<PendingSubmission>,
}

struct CallState {
    lifecycle: Lifecycle,

    session_id: Option<String>,

    /// Bumped on every start attempt and on cancellation of one
    attempt: u64,

    /// A start attempt is outstanding
    start_pending: bool,

    channel: Option<SessionChannel>,

    /// Last channel id handed out
    channel_seq: u64,

    connection: ConnectionState,

    capture: SpeechCaptureAdapter,

    /// Identity of the capture run whose events are accepted
    capture_run: u64,

    voice_preview: Option<String>,

    transcript: TranscriptLog,

    error: Option<String>,
}

enum Notice {
    Channel { channel: u64, event: ChannelEvent },
    Capture { run: u64, event: CaptureEvent },
}

struct PendingSubmission {
    session_id: String,
    text: String,
    respond_to: Option<oneshot::Sender<Result<SpeechAck, SubmitError>>>,
}

impl CallSessionController {
    /// Create an idle controller.
    ///
    /// Must be called inside a Tokio runtime. `recognizer` is `None` when
    /// the host has no speech recognition capability.
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn CallBackend>,
        connector: Arc<dyn EventStreamConnector>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
    ) -> Self {
        let capture = SpeechCaptureAdapter::new(recognizer);
        let error = if capture.is_available() {
            None
        } else {
            Some(CaptureError::Unavailable.to_string())
        };

        let state = CallState {
            lifecycle: Lifecycle::Idle,
            session_id: None,
            attempt: 0,
            start_pending: false,
            channel: None,
            channel_seq: 0,
            connection: ConnectionState::Disconnected,
            capture,
            capture_run: 0,
            voice_preview: None,
            transcript: TranscriptLog::new(),
            error,
        };

        let (snapshot, _) = watch::channel(state.snapshot());
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let (submissions, submissions_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            config,
            backend,
            connector,
            state: Mutex::new(state),
            snapshot,
            inbox,
            submissions,
        });

        tokio::spawn(pump(Arc::downgrade(&shared), inbox_rx));
        tokio::spawn(submit_worker(Arc::downgrade(&shared), submissions_rx));

        Self { shared }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Start a call.
    ///
    /// An active call is ended first, so at most one event stream is ever
    /// open. A second start while one is outstanding is refused with
    /// [`CallError::StartInProgress`].
    pub async fn start_call(&self, display_name: &str) -> Result<String, CallError> {
        let supersede = {
            let mut state = self.shared.state.lock().await;
            if state.start_pending {
                warn!("Call start already in progress, ignoring request");
                return Err(CallError::StartInProgress);
            }
            if state.lifecycle == Lifecycle::Ending {
                warn!("Previous call still ending, ignoring start request");
                return Err(CallError::EndInProgress);
            }
            state.start_pending = true;
            state.lifecycle == Lifecycle::Active
        };

        if supersede {
            info!("Ending active call before starting a new one");
            self.shared.teardown().await;
        }

        let attempt = {
            let mut state = self.shared.state.lock().await;
            state.attempt += 1;
            state.lifecycle = Lifecycle::Starting;
            state.session_id = None;
            state.transcript.clear();
            state.voice_preview = None;
            state.error = None;
            self.shared.publish(&state);
            state.attempt
        };

        info!("Starting call for {}", display_name);
        let created = self.shared.backend.create_call(display_name).await;

        let mut state = self.shared.state.lock().await;
        if state.attempt != attempt || state.lifecycle != Lifecycle::Starting {
            drop(state);
            warn!("Call start was cancelled while waiting for the backend");
            if let Ok(created) = created {
                self.shared.end_backend_call(&created.session_id).await;
            }
            return Err(CallError::StartCancelled);
        }
        state.start_pending = false;

        match created {
            Ok(created) => {
                let session_id = created.session_id;

                // Recorded before anything else can observe the session
                state.session_id = Some(session_id.clone());
                state.lifecycle = Lifecycle::Active;
                state.error = None;
                self.shared.open_channel(&mut state, &session_id);
                self.shared.publish(&state);

                info!("Call active: session {}", session_id);
                Ok(session_id)
            }
            Err(e) => {
                let err = StartError(e);
                error!("{}", err);
                state.lifecycle = Lifecycle::Idle;
                state.error = Some(err.to_string());
                self.shared.publish(&state);
                Err(err.into())
            }
        }
    }

    /// End the current call. Idempotent.
    ///
    /// Returns `true` if this call performed a teardown.
    pub async fn end_call(&self) -> bool {
        self.shared.teardown().await
    }

    /// Add recognized or typed speech to the call.
    ///
    /// Blank text, or text arriving without an active call, is ignored and
    /// returns `Ok(None)`. Otherwise a user turn is appended before the text
    /// is forwarded to the backend; a failed forward leaves the turn in place.
    pub async fn submit_voice_text(&self, text: &str) -> Result<Option<SpeechAck>, CallError> {
        let (respond_to, response) = oneshot::channel();

        {
            let mut state = self.shared.state.lock().await;
            let recorded = self.shared.record_user_turn(&mut state, text, Some(respond_to));
            if !recorded {
                return Ok(None);
            }
            self.shared.publish(&state);
        }

        match response.await {
            Ok(result) => result.map(Some).map_err(CallError::from),
            // Controller is shutting down
            Err(_) => Ok(None),
        }
    }

    /// Start speech capture if stopped, stop it if running.
    ///
    /// Returns whether capture is running afterwards. Without a recognizer
    /// this does nothing and returns `Ok(false)`.
    pub async fn toggle_capture(&self) -> Result<bool, CallError> {
        let mut state = self.shared.state.lock().await;
        if state.lifecycle != Lifecycle::Active {
            return Err(CallError::NotActive(state.lifecycle));
        }

        if !state.capture.is_available() {
            debug!("Speech capture unavailable, ignoring toggle");
            return Ok(false);
        }

        if state.capture.is_listening() {
            state.stop_capture().await;
            self.shared.publish(&state);
            return Ok(false);
        }

        match state.capture.start().await {
            Ok(events) => {
                state.capture_run += 1;
                self.shared.forward_capture(state.capture_run, events);
                self.shared.publish(&state);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to start speech capture: {}", e);
                state.error = Some(e.to_string());
                self.shared.publish(&state);
                Err(e.into())
            }
        }
    }

    /// Subscribe to published snapshots
    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> CallSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Current session id, read from the authoritative state
    pub async fn session_id(&self) -> Option<String> {
        self.shared.state.lock().await.session_id.clone()
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.shared.state.lock().await.lifecycle
    }

    pub async fn status(&self) -> CallStatus {
        self.shared.state.lock().await.status()
    }

    pub async fn transcript(&self) -> Vec<TranscriptTurn> {
        self.shared.state.lock().await.transcript.turns().to_vec()
    }
}

impl Shared {
    fn publish(&self, state: &CallState) {
        self.snapshot.send_replace(state.snapshot());
    }

    /// Replace the channel for `session_id`, closing any previous one first
    fn open_channel(&self, state: &mut CallState, session_id: &str) {
        if let Some(mut previous) = state.channel.take() {
            previous.close();
        }

        state.channel_seq += 1;
        let id = state.channel_seq;

        let (channel, mut events) = SessionChannel::open(
            id,
            session_id,
            Arc::clone(&self.connector),
            self.config.keepalive,
        );
        state.channel = Some(channel);
        state.connection = ConnectionState::Disconnected;

        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if inbox.send(Notice::Channel { channel: id, event }).is_err() {
                    break;
                }
            }
        });
    }

    fn forward_capture(&self, run: u64, mut events: mpsc::UnboundedReceiver<CaptureEvent>) {
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if inbox.send(Notice::Capture { run, event }).is_err() {
                    break;
                }
            }
        });
    }

    /// Append a user turn and queue its submission. Returns `false` if the
    /// text was ignored.
    fn record_user_turn(
        &self,
        state: &mut CallState,
        text: &str,
        respond_to: Option<oneshot::Sender<Result<SpeechAck, SubmitError>>>,
    ) -> bool {
        if text.trim().is_empty() {
            debug!("Ignoring blank voice input");
            return false;
        }

        let session_id = match (&state.session_id, state.lifecycle) {
            (Some(session_id), Lifecycle::Active) => session_id.clone(),
            _ => {
                debug!("No active call, dropping voice input: {}", text);
                return false;
            }
        };

        state.transcript.append(Speaker::User, text);

        let pending = PendingSubmission {
            session_id,
            text: text.to_string(),
            respond_to,
        };
        if self.submissions.send(pending).is_err() {
            warn!("Submission queue closed, voice input not forwarded");
        }

        true
    }

    async fn forward_speech(&self, session_id: &str, text: &str) -> Result<SpeechAck, SubmitError> {
        let speech = SpeechSubmission {
            from: self.config.from.clone(),
            to: self.config.to.clone(),
            text: text.to_string(),
            direction: SpeechDirection::Inbound,
        };

        info!("Sending voice input for session {}: {}", session_id, text);
        Ok(self.backend.submit_speech(session_id, &speech).await?)
    }

    async fn finish_submit(&self, session_id: &str, result: &Result<SpeechAck, SubmitError>) {
        let mut state = self.state.lock().await;
        if state.session_id.as_deref() != Some(session_id) {
            debug!("Discarding submission result for ended session {}", session_id);
            return;
        }

        match result {
            Ok(ack) => {
                debug!("Voice input processed: {}", ack.status);
                state.voice_preview = None;
                state.error = None;
            }
            Err(e) => {
                error!("{}", e);
                state.error = Some(e.to_string());
            }
        }
        self.publish(&state);
    }

    async fn end_backend_call(&self, session_id: &str) {
        match self.backend.end_call(session_id).await {
            Ok(_) => info!("Backend ended session {}", session_id),
            Err(e) => warn!("Backend end call failed for session {}: {}", session_id, e),
        }
    }

    /// Tear down the current call: stop capture, close the channel, notify
    /// the backend, then clear all session state. Each step runs regardless
    /// of how the others went.
    async fn teardown(&self) -> bool {
        let session_id = {
            let mut state = self.state.lock().await;
            match state.lifecycle {
                Lifecycle::Idle | Lifecycle::Ending => {
                    debug!("No call to end (state: {:?})", state.lifecycle);
                    return false;
                }
                Lifecycle::Starting => {
                    info!("Cancelling call start in progress");
                    state.attempt += 1;
                    state.start_pending = false;
                    state.lifecycle = Lifecycle::Idle;
                    self.publish(&state);
                    return true;
                }
                Lifecycle::Active => {}
            }

            info!("Ending call");
            state.lifecycle = Lifecycle::Ending;

            state.stop_capture().await;

            if let Some(mut channel) = state.channel.take() {
                channel.close();
            }
            state.connection = ConnectionState::Disconnected;

            self.publish(&state);
            state.session_id.clone()
        };

        if let Some(session_id) = &session_id {
            self.end_backend_call(session_id).await;
        }

        let mut state = self.state.lock().await;
        // A superseding start may already own the state
        if state.lifecycle == Lifecycle::Ending {
            state.session_id = None;
            state.transcript.clear();
            state.voice_preview = None;
            state.error = None;
            state.lifecycle = Lifecycle::Idle;
            self.publish(&state);
        }

        info!("Call ended");
        true
    }

    async fn on_channel_event(&self, channel: u64, event: ChannelEvent) {
        let mut state = self.state.lock().await;

        let live = state.lifecycle == Lifecycle::Active
            && state.channel.as_ref().map(SessionChannel::id) == Some(channel);
        if !live {
            debug!("Ignoring event from stale channel {}: {:?}", channel, event);
            return;
        }

        match event {
            ChannelEvent::Connection(connection) => {
                info!("Event stream {:?}", connection);
                state.connection = connection;
                if connection == ConnectionState::Connected {
                    state.error = None;
                }
                self.publish(&state);
            }
            ChannelEvent::Inbound(InboundEvent::TranscriptUpdate(item)) => {
                state.transcript.append(item.speaker, item.text);
                self.publish(&state);
            }
            ChannelEvent::Inbound(InboundEvent::TranscriptBatch(items)) => {
                let appended = state.transcript.batch_append(items);
                debug!("Appended {} transcript turns from batch", appended.len());
                self.publish(&state);
            }
            ChannelEvent::Inbound(InboundEvent::Other(kind)) => {
                debug!("Received non-transcript event: {}", kind);
            }
            ChannelEvent::Failed(e) => {
                error!("Event stream failed, ending call: {}", e);
                drop(state);

                self.teardown().await;

                let mut state = self.state.lock().await;
                if state.lifecycle == Lifecycle::Idle {
                    state.error = Some(e.to_string());
                    self.publish(&state);
                }
            }
        }
    }

    async fn on_capture_event(&self, run: u64, event: CaptureEvent) {
        let mut state = self.state.lock().await;

        if run != state.capture_run || state.lifecycle != Lifecycle::Active {
            debug!("Ignoring event from stale capture run {}: {:?}", run, event);
            return;
        }

        match event {
            CaptureEvent::Started => info!("Speech recognition started"),
            CaptureEvent::Stopped => info!("Speech recognition ended"),
            CaptureEvent::Interim(text) => {
                state.voice_preview = Some(text);
            }
            CaptureEvent::Final(text) => {
                info!("Final transcript: {}", text);
                state.voice_preview = Some(text.clone());
                self.record_user_turn(&mut state, &text, None);
            }
            CaptureEvent::Failed(reason) => {
                state.error = Some(CaptureError::Engine(reason).to_string());
            }
        }

        self.publish(&state);
    }
}

impl CallState {
    /// Stop capture and disarm the run's remaining events
    async fn stop_capture(&mut self) {
        self.capture_run += 1;
        self.capture.stop().await;
    }

    fn status(&self) -> CallStatus {
        CallStatus {
            lifecycle: self.lifecycle,
            session_id: self.session_id.clone(),
            connection: self.connection,
            listening: self.capture.is_listening(),
            capture_available: self.capture.is_available(),
            voice_preview: self.voice_preview.clone(),
            error: self.error.clone(),
            transcript_len: self.transcript.len(),
        }
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            status: self.status(),
            transcript: self.transcript.turns().to_vec(),
        }
    }
}

async fn pump(shared: Weak<Shared>, mut inbox: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = inbox.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };

        match notice {
            Notice::Channel { channel, event } => shared.on_channel_event(channel, event).await,
            Notice::Capture { run, event } => shared.on_capture_event(run, event).await,
        }
    }
}

async fn submit_worker(
    shared: Weak<Shared>,
    mut submissions: mpsc::UnboundedReceiver<PendingSubmission>,
) {
    while let Some(pending) = submissions.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };

        let result = shared.forward_speech(&pending.session_id, &pending.text).await;
        shared.finish_submit(&pending.session_id, &result).await;

        if let Some(respond_to) = pending.respond_to {
            let _ = respond_to.send(result);
        }
    }
}
