//! Outbound notifications from a session to its client.

use std::sync::Arc;

use ctxkit_core::{CtxError, Message, Notification};
use ctxkit_transport::Transport;
use futures::future::BoxFuture;

/// Sends notifications to the client of a session.
pub trait Peer: Send + Sync {
    /// Send a notification.
    fn notify(&self, notification: Notification) -> BoxFuture<'_, Result<(), CtxError>>;
}

/// A [`Peer`] writing to a transport.
pub struct TransportPeer<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> TransportPeer<T> {
    /// Create a peer over a shared transport.
    pub const fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport + 'static> Peer for TransportPeer<T>
where
    T::Error: Into<CtxError>,
{
    fn notify(&self, notification: Notification) -> BoxFuture<'_, Result<(), CtxError>> {
        Box::pin(async move {
            self.transport
                .send(Message::Notification(notification))
                .await
                .map_err(Into::into)
        })
    }
}
