//! Session event stream
//!
//! This module provides the `SessionChannel` abstraction that manages:
//! - One persistent connection per session id (WebSocket in production)
//! - Envelope decoding into `InboundEvent`s
//! - Keepalive pings
//! - Connection state reporting

mod channel;
mod messages;
mod stream;

pub use channel::{ChannelEvent, ConnectionState, SessionChannel};
pub use messages::{parse_envelope, ping_envelope, EnvelopeError, InboundEvent};
pub use stream::{EventStream, EventStreamConnector, WsConnector};
