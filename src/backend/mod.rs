pub mod client;
pub mod messages;

pub use client::{CallBackend, HttpCallBackend};
pub use messages::{
    CreateCallRequest, CreateCallResponse, EndCallAck, HealthStatus, SpeechAck, SpeechDirection,
    SpeechSubmission,
};
