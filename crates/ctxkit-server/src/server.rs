//! Server bootstrap and the per-connection message loop.
//!
//! [`ContextServer`] owns the handler registries. Each accepted connection
//! gets its own [`Session`] and a [`ConnectionRuntime`] that reads
//! messages until the peer goes away.

use std::sync::Arc;

use ctxkit_core::protocol::methods;
use ctxkit_core::{CtxError, JsonRpcError, Message, Request, RequestId, Response};
use ctxkit_transport::{Transport, TransportListener, WebSocketListener};
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use crate::handler::{Completion, Prompt, Resource, Tool};
use crate::peer::{Peer, TransportPeer};
use crate::router;
use crate::session::Session;
use crate::state::ServerState;

/// A context server.
///
/// Cloning is cheap; clones share registries and sessions.
///
/// ```rust
/// use ctxkit_server::builtin::EchoTool;
/// use ctxkit_server::handler::Typed;
/// use ctxkit_server::{ContextServer, ServerConfig};
///
/// let server = ContextServer::new(ServerConfig::default());
/// server.register_tool(Typed(EchoTool)).unwrap();
/// assert!(server.register_tool(Typed(EchoTool)).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct ContextServer {
    state: Arc<ServerState>,
}

impl ContextServer {
    /// Create a server with empty registries.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(config)),
        }
    }

    /// Shared state.
    #[must_use]
    pub const fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        self.state.config()
    }

    /// Replace all tools.
    pub fn set_tools(
        &self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<(), CtxError> {
        self.state.tools().replace(tools)
    }

    /// Replace all resources.
    pub fn set_resources(
        &self,
        resources: impl IntoIterator<Item = Arc<dyn Resource>>,
    ) -> Result<(), CtxError> {
        self.state.resources().replace(resources)
    }

    /// Replace all prompts.
    pub fn set_prompts(
        &self,
        prompts: impl IntoIterator<Item = Arc<dyn Prompt>>,
    ) -> Result<(), CtxError> {
        self.state.prompts().replace(prompts)
    }

    /// Register one tool.
    pub fn register_tool(&self, tool: impl Tool) -> Result<(), CtxError> {
        self.state.tools().register(Arc::new(tool))
    }

    /// Register one resource.
    pub fn register_resource(&self, resource: impl Resource) -> Result<(), CtxError> {
        self.state.resources().register(Arc::new(resource))
    }

    /// Register one prompt.
    pub fn register_prompt(&self, prompt: impl Prompt) -> Result<(), CtxError> {
        self.state.prompts().register(Arc::new(prompt))
    }

    /// Install the completion handler.
    pub fn set_completion(&self, completion: impl Completion) {
        self.state.set_completion(Arc::new(completion));
    }

    /// A session not bound to any connection, for in-process use.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.state))
    }

    /// Push a resource update to every session subscribed to `uri`.
    pub async fn notify_resource_updated(&self, uri: &str) -> usize {
        self.state.notify_resource_updated(uri).await
    }

    /// Serve one connection until it closes.
    pub async fn serve<T>(&self, transport: T) -> Result<(), CtxError>
    where
        T: Transport + 'static,
        T::Error: Into<CtxError>,
    {
        let transport = Arc::new(transport);
        let peer: Arc<dyn Peer> = Arc::new(TransportPeer::new(Arc::clone(&transport)));
        let session = Arc::new(Session::with_peer(Arc::clone(&self.state), peer));

        tracing::info!(
            session = %session.id(),
            remote = ?transport.metadata().remote_addr,
            "connection opened"
        );

        let runtime = ConnectionRuntime {
            transport,
            session: Arc::clone(&session),
        };
        let result = runtime.run().await;
        session.close();
        result
    }

    /// Bind the configured WebSocket endpoint.
    pub async fn bind(&self) -> Result<WebSocketListener, CtxError> {
        let config = self.config();
        let listener =
            WebSocketListener::bind(config.address().bind_addr(), config.websocket()).await?;
        Ok(listener)
    }

    /// Accept connections from `listener` and serve each on its own task.
    ///
    /// Returns when the listener stops.
    pub async fn serve_listener<L>(&self, listener: L) -> Result<(), CtxError>
    where
        L: TransportListener,
        L::Error: Into<CtxError>,
        <L::Transport as Transport>::Error: Into<CtxError>,
    {
        loop {
            let transport = listener.accept().await.map_err(Into::into)?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve(transport).await {
                    tracing::warn!(error = %e, "connection ended with an error");
                }
            });
        }
    }

    /// Bind the configured endpoint and serve forever.
    pub async fn run(&self) -> Result<(), CtxError> {
        let listener = self.bind().await?;
        tracing::info!(
            addr = %listener.local_socket_addr(),
            server = %self.config().server_info.name,
            "context server listening"
        );
        self.serve_listener(listener).await
    }
}

/// Reads messages from one connection and answers them.
///
/// Requests run concurrently, except `initialize`, which is answered
/// before the next message is read.
pub struct ConnectionRuntime<T: Transport> {
    transport: Arc<T>,
    session: Arc<Session>,
}

impl<T> ConnectionRuntime<T>
where
    T: Transport + 'static,
    T::Error: Into<CtxError>,
{
    /// Create a runtime for a session.
    pub const fn new(transport: Arc<T>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    /// Run until the connection closes.
    ///
    /// In-flight requests are aborted when it does.
    pub async fn run(&self) -> Result<(), CtxError> {
        let mut in_flight = JoinSet::new();

        let outcome = loop {
            while in_flight.try_join_next().is_some() {}

            match self.transport.recv().await {
                Ok(Some(Message::Request(request))) => {
                    if request.method() == methods::INITIALIZE {
                        respond(&self.session, self.transport.as_ref(), request).await;
                    } else {
                        let session = Arc::clone(&self.session);
                        let transport = Arc::clone(&self.transport);
                        in_flight.spawn(async move {
                            respond(&session, transport.as_ref(), request).await;
                        });
                    }
                }
                Ok(Some(Message::Notification(notification))) => {
                    tracing::debug!(method = %notification.method(), "handling notification");
                    router::handle_notification(&self.session, &notification).await;
                }
                Ok(Some(Message::Response(response))) => {
                    tracing::warn!(id = %response.id, "unexpected response from client");
                }
                Ok(None) => {
                    tracing::info!(session = %self.session.id(), "connection closed");
                    break Ok(());
                }
                Err(e) => {
                    let err: CtxError = e.into();
                    if err.is_malformed_frame() {
                        tracing::warn!(
                            session = %self.session.id(),
                            error = %err,
                            "malformed frame"
                        );
                        reject_malformed(self.transport.as_ref(), &err).await;
                        continue;
                    }
                    tracing::error!(
                        session = %self.session.id(),
                        error = %err,
                        "transport error"
                    );
                    break Err(err);
                }
            }
        };

        in_flight.abort_all();
        outcome
    }
}

/// Answer an undecodable frame with a parse error. Its id is unknown, so
/// the response carries `null`.
async fn reject_malformed<T>(transport: &T, err: &CtxError)
where
    T: Transport,
    T::Error: Into<CtxError>,
{
    let parse = CtxError::parse(err.to_string());
    let response = Response::error(RequestId::Null, JsonRpcError::from(&parse));
    if let Err(e) = transport.send(Message::Response(response)).await {
        let err: CtxError = e.into();
        tracing::debug!(error = %err, "failed to send parse error");
    }
}

async fn respond<T>(session: &Session, transport: &T, request: Request)
where
    T: Transport,
    T::Error: Into<CtxError>,
{
    let id = request.id.clone();
    tracing::debug!(method = %request.method(), id = %id, "handling request");

    let response = match router::dispatch(session, &request).await {
        Ok(result) => Response::success(id, result),
        Err(e) => {
            tracing::debug!(method = %request.method(), error = %e, "request failed");
            Response::error(id, JsonRpcError::from(&e))
        }
    };

    if let Err(e) = transport.send(Message::Response(response)).await {
        let err: CtxError = e.into();
        tracing::error!(method = %request.method(), error = %err, "failed to send response");
    }
}
