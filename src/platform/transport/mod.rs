// Stream transports
// The publish loop only sees StreamTransport; the WebSocket server adapts sockets onto a channel transport

pub mod channel;
pub mod websocket;

pub use channel::{ChannelTransport, TransportEvent};
pub use websocket::{router, serve, AppState};

use async_trait::async_trait;

/// Outbound side of a client session
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Push one serialized message to the client
    async fn send_text(&mut self, text: String) -> TransportResult<()>;

    /// Close the session. Closing twice reports `AlreadyClosed`.
    async fn close(&mut self) -> TransportResult<()>;

    fn is_closed(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Client disconnected")]
    Disconnected,

    #[error("Transport already closed")]
    AlreadyClosed,

    #[error("Server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
