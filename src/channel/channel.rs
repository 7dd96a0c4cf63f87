use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};
use tracing::{debug, error, info, warn};

use super::messages::{parse_envelope, ping_envelope, InboundEvent};
use super::stream::EventStreamConnector;
use crate::error::ChannelError;

/// Event stream connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// What a [`SessionChannel`] reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connection(ConnectionState),
    Inbound(InboundEvent),
    /// Stream-level failure; the connection is gone
    Failed(ChannelError),
}

/// One persistent event-stream connection bound to a session id.
///
/// The connection is driven by a background task. It never reconnects on
/// its own; after a disconnect the owner decides what happens next.
pub struct SessionChannel {
    /// Owner-assigned identity, echoed on every event
    id: u64,

    session_id: String,

    /// Cleared on close; the task emits nothing once this is false
    armed: Arc<AtomicBool>,

    shutdown: Option<oneshot::Sender<()>>,

    task: Option<JoinHandle<()>>,
}

impl SessionChannel {
    /// Open the event stream for `session_id`.
    ///
    /// Returns immediately; `Connected` (or `Failed`) arrives on the
    /// returned receiver once the connection attempt resolves.
    pub fn open(
        id: u64,
        session_id: impl Into<String>,
        connector: Arc<dyn EventStreamConnector>,
        keepalive: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let armed = Arc::new(AtomicBool::new(true));

        info!("Opening event stream {} for session {}", id, session_id);

        let task = tokio::spawn(run(
            session_id.clone(),
            connector,
            keepalive,
            Emitter {
                armed: Arc::clone(&armed),
                tx,
            },
            shutdown_rx,
        ));

        let channel = Self {
            id,
            session_id,
            armed,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        };

        (channel, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the connection task is still running
    pub fn is_open(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
            && self
                .task
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false)
    }

    /// Close the connection. Idempotent; no events are emitted after this
    /// returns.
    pub fn close(&mut self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("Closing event stream {} for session {}", self.id, self.session_id);

        if let Some(shutdown) = self.shutdown.take() {
            // Task may already be gone; dropping the handle below is enough then
            let _ = shutdown.send(());
        }
        self.task.take();
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.close();
    }
}

struct Emitter {
    armed: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl Emitter {
    fn emit(&self, event: ChannelEvent) {
        if self.armed.load(Ordering::SeqCst) {
            let _ = self.tx.send(event);
        }
    }
}

async fn run(
    session_id: String,
    connector: Arc<dyn EventStreamConnector>,
    keepalive: Option<Duration>,
    emitter: Emitter,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        _ = &mut shutdown => {
            debug!("Event stream for session {} closed while connecting", session_id);
            return;
        }
        connected = connector.connect(&session_id) => connected,
    };

    let mut stream = match connected {
        Ok(stream) => stream,
        Err(e) => {
            error!("Event stream connect failed for session {}: {}", session_id, e);
            emitter.emit(ChannelEvent::Failed(e));
            return;
        }
    };

    info!("Event stream connected for session {}", session_id);
    emitter.emit(ChannelEvent::Connection(ConnectionState::Connected));

    let mut ticker = keepalive
        .filter(|period| !period.is_zero())
        .map(|period| tokio::time::interval_at(Instant::now() + period, period));

    loop {
        let frame = tokio::select! {
            _ = &mut shutdown => {
                stream.close().await;
                debug!("Event stream for session {} shut down", session_id);
                return;
            }
            _ = next_tick(&mut ticker) => {
                if let Err(e) = stream.send(ping_envelope()).await {
                    warn!("Keepalive ping failed for session {}: {}", session_id, e);
                }
                continue;
            }
            frame = stream.recv() => frame,
        };

        match frame {
            Some(Ok(payload)) => match parse_envelope(&payload) {
                Ok(event) => emitter.emit(ChannelEvent::Inbound(event)),
                Err(e) => warn!("Dropping malformed event payload ({}): {}", e, payload),
            },
            Some(Err(e)) => {
                error!("Event stream error for session {}: {}", session_id, e);
                emitter.emit(ChannelEvent::Connection(ConnectionState::Disconnected));
                emitter.emit(ChannelEvent::Failed(e));
                return;
            }
            None => {
                info!("Event stream disconnected for session {}", session_id);
                emitter.emit(ChannelEvent::Connection(ConnectionState::Disconnected));
                return;
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
