use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::transcript::{Speaker, TranscriptItem};

/// Event pushed by the backend over the session's event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `{"type": "transcript_update", "speaker", "text"}`
    TranscriptUpdate(TranscriptItem),
    /// `{"type": "transcript", "data": [...]}`, items in array order
    TranscriptBatch(Vec<TranscriptItem>),
    /// Any other envelope type; carries the tag only
    Other(String),
}

/// Why a payload could not be decoded as an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope has no string \"type\" field")]
    MissingType,

    #[error("transcript_update carries no text")]
    MissingText,
}

#[derive(Debug, Deserialize)]
struct TranscriptUpdateMessage {
    speaker: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptItemMessage {
    speaker: Option<String>,
    text: Option<String>,
    content: Option<String>,
    message: Option<String>,
}

impl TranscriptItemMessage {
    /// First non-empty of `text`, `content`, `message`
    fn into_item(self) -> Option<TranscriptItem> {
        let speaker = Speaker::from_wire(self.speaker.as_deref());
        [self.text, self.content, self.message]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
            .map(|text| TranscriptItem::new(speaker, text))
    }
}

/// Decode one event-stream payload
pub fn parse_envelope(payload: &str) -> Result<InboundEvent, EnvelopeError> {
    let value: Value = serde_json::from_str(payload)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingType)?
        .to_string();

    match kind.as_str() {
        "transcript_update" => {
            let update: TranscriptUpdateMessage = serde_json::from_value(value)?;
            let text = update
                .text
                .filter(|text| !text.trim().is_empty())
                .ok_or(EnvelopeError::MissingText)?;
            let speaker = Speaker::from_wire(update.speaker.as_deref());
            Ok(InboundEvent::TranscriptUpdate(TranscriptItem::new(speaker, text)))
        }
        "transcript" => match value.get("data").and_then(Value::as_array) {
            Some(data) => {
                let items = data
                    .iter()
                    .enumerate()
                    .filter_map(|(index, raw)| {
                        match serde_json::from_value::<TranscriptItemMessage>(raw.clone()) {
                            Ok(item) => {
                                let item = item.into_item();
                                if item.is_none() {
                                    warn!("Dropping transcript item {} without text", index);
                                }
                                item
                            }
                            Err(e) => {
                                warn!("Dropping malformed transcript item {}: {}", index, e);
                                None
                            }
                        }
                    })
                    .collect();
                Ok(InboundEvent::TranscriptBatch(items))
            }
            None => Ok(InboundEvent::Other(kind)),
        },
        _ => Ok(InboundEvent::Other(kind)),
    }
}

/// Keepalive envelope sent to the backend
pub fn ping_envelope() -> String {
    serde_json::json!({ "type": "ping" }).to_string()
}
