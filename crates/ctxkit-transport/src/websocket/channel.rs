//! Message framing shared by both WebSocket ends.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ctxkit_core::protocol::Message;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use super::server::ActiveConnectionGuard;
use crate::error::TransportError;
use crate::runtime::AsyncMutex;
use crate::traits::{Transport, TransportMetadata};

/// A WebSocket stream split into independently locked halves, so a reader
/// parked in `recv` never blocks a writer.
pub(crate) struct Framed<S> {
    sink: AsyncMutex<SplitSink<WebSocketStream<S>, WsMessage>>,
    stream: AsyncMutex<SplitStream<WebSocketStream<S>>>,
    connected: AtomicBool,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl<S> Framed<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: AsyncMutex::new(sink),
            stream: AsyncMutex::new(stream),
            connected: AtomicBool::new(true),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
        }
    }

    pub(crate) async fn send(&self, msg: &Message) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let json = serde_json::to_string(msg)?;
        self.sink
            .lock()
            .await
            .send(WsMessage::text(json))
            .await
            .map_err(|e| {
                TransportError::connection(format!("Failed to send WebSocket message: {e}"))
            })?;

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) async fn recv(&self) -> Result<Option<Message>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let frame = match stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(
                    WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake),
                ))
                | None => {
                    self.connected.store(false, Ordering::Release);
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::Release);
                    return Err(TransportError::connection(format!(
                        "WebSocket receive error: {e}"
                    )));
                }
            };

            // A bad payload is reported without marking the channel closed,
            // so the caller can answer it and keep reading.
            let msg: Message = match frame {
                WsMessage::Text(text) => {
                    serde_json::from_str(&text).map_err(TransportError::Malformed)?
                }
                WsMessage::Binary(data) => {
                    serde_json::from_slice(&data).map_err(TransportError::Malformed)?
                }
                WsMessage::Close(frame) => {
                    tracing::debug!(frame = ?frame, "WebSocket close frame received");
                    self.connected.store(false, Ordering::Release);
                    return Ok(None);
                }
                // tungstenite answers pings itself on the next write
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            self.messages_received.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(msg));
        }
    }

    pub(crate) async fn close(&self) -> Result<(), TransportError> {
        if self.connected.swap(false, Ordering::AcqRel) {
            // The peer may already be gone; a failed close frame is not an error.
            let _ = self.sink.lock().await.close().await;
        }
        Ok(())
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub(crate) fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }
}

/// A server-side WebSocket connection produced by
/// [`WebSocketListener`](super::WebSocketListener).
pub struct WebSocketConnection {
    framed: Framed<TcpStream>,
    peer_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    connection_id: u64,
    _guard: ActiveConnectionGuard,
}

impl WebSocketConnection {
    pub(crate) fn new(
        stream: WebSocketStream<TcpStream>,
        peer_addr: SocketAddr,
        connection_id: u64,
        guard: ActiveConnectionGuard,
    ) -> Self {
        let local_addr = stream.get_ref().local_addr().ok();
        Self {
            framed: Framed::new(stream),
            peer_addr,
            local_addr,
            connection_id,
            _guard: guard,
        }
    }

    /// Remote peer address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Listener-assigned id, unique per listener.
    #[must_use]
    pub const fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Messages written so far.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.framed.messages_sent()
    }

    /// Messages read so far.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.framed.messages_received()
    }
}

impl Transport for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        self.framed.send(&msg).await
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        self.framed.recv().await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.framed.close().await
    }

    fn is_connected(&self) -> bool {
        self.framed.is_connected()
    }

    fn metadata(&self) -> TransportMetadata {
        let meta = TransportMetadata::new("websocket").remote_addr(self.peer_addr.to_string());
        match self.local_addr {
            Some(addr) => meta.local_addr(addr.to_string()),
            None => meta,
        }
    }
}
