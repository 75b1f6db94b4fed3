//! In-memory transport.
//!
//! A connected pair of channel-backed transports, used to run a session
//! in-process (tests, benchmarks, embedding) without any network I/O.
//!
//! ```rust
//! use ctxkit_transport::{MemoryTransport, Transport};
//!
//! let (client, server) = MemoryTransport::pair();
//! assert!(client.is_connected());
//! assert!(server.is_connected());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ctxkit_core::protocol::Message;
use futures::channel::mpsc;

use crate::error::TransportError;
use crate::runtime::AsyncMutex;
use crate::traits::{Transport, TransportMetadata};

/// One end of an in-memory connection.
///
/// Closing (or dropping) either end closes both directions: buffered
/// messages are still delivered, then `recv` returns `Ok(None)` on both
/// sides.
pub struct MemoryTransport {
    /// Feeds the peer.
    outbound: mpsc::Sender<Message>,
    /// Feeds our own receiver; held so `close` can end it.
    inbound: mpsc::Sender<Message>,
    receiver: AsyncMutex<mpsc::Receiver<Message>>,
    connected: Arc<AtomicBool>,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Create a connected pair.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(32)
    }

    /// Create a connected pair with a specific buffer capacity per direction.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(capacity);
        let (tx2, rx2) = mpsc::channel(capacity);

        let connected = Arc::new(AtomicBool::new(true));

        let first = Self {
            outbound: tx2.clone(),
            inbound: tx1.clone(),
            receiver: AsyncMutex::new(rx1),
            connected: Arc::clone(&connected),
            metadata: TransportMetadata::new("memory")
                .local_addr("peer-0")
                .remote_addr("peer-1")
                .connected_now(),
        };

        let second = Self {
            outbound: tx1,
            inbound: tx2,
            receiver: AsyncMutex::new(rx2),
            connected,
            metadata: TransportMetadata::new("memory")
                .local_addr("peer-1")
                .remote_addr("peer-0")
                .connected_now(),
        };

        (first, second)
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.outbound.clone().close_channel();
        self.inbound.clone().close_channel();
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        use futures::SinkExt;

        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut sender = self.outbound.clone();
        sender
            .send(msg)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        use futures::StreamExt;

        let mut receiver = self.receiver.lock().await;
        let next = receiver.next().await;
        if next.is_none() {
            self.connected.store(false, Ordering::SeqCst);
        }
        Ok(next)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.shutdown();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxkit_core::protocol::{Notification, Request, RequestId};

    #[tokio::test]
    async fn test_send_receive() {
        let (client, server) = MemoryTransport::pair();

        client
            .send(Message::Request(Request::new("ping", RequestId::Number(1))))
            .await
            .unwrap();

        match server.recv().await.unwrap().unwrap() {
            Message::Request(req) => assert_eq!(req.method(), "ping"),
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bidirectional() {
        let (client, server) = MemoryTransport::pair();

        client
            .send(Notification::new("notifications/roots/list_changed").into())
            .await
            .unwrap();
        server
            .send(Notification::new("notifications/message").into())
            .await
            .unwrap();

        assert_eq!(
            server.recv().await.unwrap().unwrap().method(),
            Some("notifications/roots/list_changed")
        );
        assert_eq!(
            client.recv().await.unwrap().unwrap().method(),
            Some("notifications/message")
        );
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let (client, server) = MemoryTransport::pair();

        client
            .send(Notification::new("last").into())
            .await
            .unwrap();
        client.close().await.unwrap();

        assert!(!client.is_connected());
        assert!(!server.is_connected());
        assert_eq!(server.recv().await.unwrap().unwrap().method(), Some("last"));
        assert!(server.recv().await.unwrap().is_none());
        assert!(client.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (client, _server) = MemoryTransport::pair();
        client.close().await.unwrap();

        let result = client.send(Notification::new("late").into()).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_drop_ends_peer() {
        let (client, server) = MemoryTransport::pair();
        drop(client);
        assert!(server.recv().await.unwrap().is_none());
    }
}
