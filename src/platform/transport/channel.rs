// Channel-backed transport: messages go into a bounded mpsc queue drained by a socket task

use super::{StreamTransport, TransportError, TransportResult};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// What the consuming side of a channel transport receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Closed,
}

pub struct ChannelTransport {
    tx: mpsc::Sender<TransportEvent>,
    closed: bool,
}

impl ChannelTransport {
    /// Create a transport and the receiver that drains it.
    /// Dropping the receiver makes subsequent sends fail with `Disconnected`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, closed: false }, rx)
    }
}

#[async_trait]
impl StreamTransport for ChannelTransport {
    async fn send_text(&mut self, text: String) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::AlreadyClosed);
        }
        self.tx
            .send(TransportEvent::Text(text))
            .await
            .map_err(|_| TransportError::Disconnected)
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::AlreadyClosed);
        }
        self.closed = true;
        // Never waits: a full queue or a vanished peer still counts as closed.
        // The consumer also sees the end of the channel once this side is dropped.
        let _ = self.tx.try_send(TransportEvent::Closed);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_arrive_in_order_then_close() {
        let (mut transport, mut rx) = ChannelTransport::new(8);
        transport.send_text("one".to_string()).await.unwrap();
        transport.send_text("two".to_string()).await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(rx.recv().await, Some(TransportEvent::Text("one".to_string())));
        assert_eq!(rx.recv().await, Some(TransportEvent::Text("two".to_string())));
        assert_eq!(rx.recv().await, Some(TransportEvent::Closed));
        drop(transport);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_twice_is_reported() {
        let (mut transport, _rx) = ChannelTransport::new(1);
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert!(matches!(transport.close().await, Err(TransportError::AlreadyClosed)));
        assert!(matches!(
            transport.send_text("late".to_string()).await,
            Err(TransportError::AlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn test_close_does_not_wait_on_full_queue() {
        let (mut transport, mut rx) = ChannelTransport::new(1);
        transport.send_text("pending".to_string()).await.unwrap();

        let closed = tokio::time::timeout(std::time::Duration::from_secs(1), transport.close()).await;
        assert!(matches!(closed, Ok(Ok(()))));
        assert!(transport.is_closed());

        drop(transport);
        assert_eq!(rx.recv().await, Some(TransportEvent::Text("pending".to_string())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_a_disconnect() {
        let (mut transport, rx) = ChannelTransport::new(1);
        drop(rx);
        assert!(matches!(
            transport.send_text("hello".to_string()).await,
            Err(TransportError::Disconnected)
        ));
        assert!(transport.close().await.is_ok());
    }
}
