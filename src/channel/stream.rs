use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::ChannelError;

/// Opens the backend event stream for a session
#[async_trait::async_trait]
pub trait EventStreamConnector: Send + Sync {
    async fn connect(&self, session_id: &str) -> Result<Box<dyn EventStream>, ChannelError>;
}

/// One live, bidirectional text-frame connection
#[async_trait::async_trait]
pub trait EventStream: Send {
    /// Next text payload; `None` once the peer has closed the stream
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    /// Send a text payload
    async fn send(&mut self, payload: String) -> Result<(), ChannelError>;

    /// Close the stream (best effort)
    async fn close(&mut self);
}

/// WebSocket connector for `{base_url}/ws/{session_id}`
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, session_id: &str) -> String {
        format!("{}/ws/{}", self.base_url.trim_end_matches('/'), session_id)
    }
}

#[async_trait::async_trait]
impl EventStreamConnector for WsConnector {
    async fn connect(&self, session_id: &str) -> Result<Box<dyn EventStream>, ChannelError> {
        let url = self.url_for(session_id);
        info!("Connecting event stream at {}", url);

        let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        Ok(Box::new(WsEventStream { socket }))
    }
}

struct WsEventStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl EventStream for WsEventStream {
    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            let message = match self.socket.next().await? {
                Ok(message) => message,
                Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed) => return None,
                Err(e) => return Some(Err(ChannelError::Stream(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Message::Close(frame) => {
                    debug!("Event stream closed by peer: {:?}", frame);
                    return None;
                }
                // tungstenite answers pings on its own
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send(&mut self, payload: String) -> Result<(), ChannelError> {
        self.socket
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| ChannelError::Stream(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!("Event stream close: {}", e);
        }
    }
}
