pub mod backend;
pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transcript;

pub use backend::{CallBackend, HttpCallBackend, SpeechAck, SpeechDirection, SpeechSubmission};
pub use capture::{
    CaptureEvent, ConsoleRecognizer, RecognitionSegment, RecognizerConfig, RecognizerEvent,
    SpeechCaptureAdapter, SpeechRecognizer,
};
pub use channel::{
    ChannelEvent, ConnectionState, EventStream, EventStreamConnector, InboundEvent,
    SessionChannel, WsConnector,
};
pub use config::Config;
pub use error::{BackendError, CallError, CaptureError, ChannelError, StartError, SubmitError};
pub use http::{create_router, AppState};
pub use session::{CallSessionController, CallSnapshot, CallStatus, Lifecycle, SessionConfig};
pub use transcript::{Speaker, TranscriptItem, TranscriptLog, TranscriptTurn, TurnId};
