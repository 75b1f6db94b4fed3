//! Context client implementation.
//!
//! The [`ContextClient`] struct provides typed calls for every session
//! operation. It handles:
//!
//! - The `initialize` handshake and protocol version check
//! - Request/response correlation over a shared transport
//! - Server notifications (resource updates, log messages)
//! - Connection lifecycle

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ctxkit_core::capability::{
    InitializeRequest, InitializeResponse, SUPPORTED_PROTOCOL_VERSIONS, is_version_supported,
};
use ctxkit_core::error::TransportErrorKind;
use ctxkit_core::protocol::{methods, notifications};
use ctxkit_core::types::{CallParams, CompleteParams, OptionsParams, SetLevelParams, UriParams};
use ctxkit_core::{
    Capabilities, ClientInfo, CtxError, JsonRpcError, ListResponse, LoggingLevel, Message,
    Notification, PromptMetadata, Request, RequestId, RequestOptions, ResourceMetadata, Response,
    ServerInfo, ToolMetadata,
};
use ctxkit_transport::runtime::AsyncRwLock;
use ctxkit_transport::{Transport, WebSocketTransport};
use futures::channel::oneshot;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use crate::builder::ClientBuilder;

type PendingMap = Arc<AsyncRwLock<HashMap<RequestId, oneshot::Sender<Response>>>>;

/// Id of the `initialize` request. Later requests count up from 1.
const INITIALIZE_ID: u64 = 0;

/// How many unread notifications a slow subscriber may fall behind by.
const NOTIFICATION_BUFFER: usize = 64;

/// A client connected to a context server.
///
/// Every session operation is available as a typed method:
///
/// - Lifecycle: `ping()`, `close()`
/// - Tools: `list_tools()`, `call_tool()`
/// - Resources: `list_resources()`, `read_resource()`,
///   `subscribe_resource()`, `unsubscribe_resource()`
/// - Prompts: `list_prompts()`, `get_prompt()`
/// - Logging and completion: `set_logging_level()`, `complete()`
/// - Notifications: `send_roots_list_changed()`, `notifications()`
///
/// Failures reported by the server arrive as the same structured
/// [`CtxError`] variant the server produced.
///
/// # Example
///
/// ```no_run
/// use ctxkit_client::ContextClient;
/// use ctxkit_core::{Envelope, RequestOptions};
///
/// # async fn example() -> Result<(), ctxkit_core::CtxError> {
/// let client = ContextClient::connect_server("127.0.0.1", 8888).await?;
/// let echoed = client
///     .call_tool("echo", &Envelope::new("Hello, World!"), RequestOptions::default())
///     .await?;
/// assert_eq!(echoed, "Hello, World!");
/// # Ok(())
/// # }
/// ```
pub struct ContextClient<T: Transport> {
    transport: Arc<T>,
    server_info: ServerInfo,
    server_caps: Capabilities,
    protocol_version: String,
    instructions: Option<String>,
    client_info: ClientInfo,
    next_id: AtomicU64,
    pending: PendingMap,
    notifications: broadcast::Sender<Notification>,
    running: Arc<AtomicBool>,
    router: tokio::task::JoinHandle<()>,
}

impl ContextClient<WebSocketTransport> {
    /// Connect to a server over WebSocket with the default client identity.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot be reached or the handshake fails.
    pub async fn connect_server(
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, CtxError> {
        ClientBuilder::new().host(host).port(port).connect().await
    }
}

impl<T> ContextClient<T>
where
    T: Transport + 'static,
    T::Error: Into<CtxError>,
{
    pub(crate) fn new(transport: T, client_info: ClientInfo, init: InitializeResponse) -> Self {
        let transport = Arc::new(transport);
        let pending: PendingMap = Arc::new(AsyncRwLock::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);

        let router = spawn_message_router(
            Arc::clone(&transport),
            Arc::clone(&pending),
            notifications.clone(),
            Arc::clone(&running),
        );

        info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol_version = %init.protocol_version,
            "connected to context server"
        );

        Self {
            transport,
            server_info: init.server_info,
            server_caps: init.capabilities,
            protocol_version: init.protocol_version,
            instructions: init.instructions,
            client_info,
            next_id: AtomicU64::new(INITIALIZE_ID + 1),
            pending,
            notifications,
            running,
            router,
        }
    }

    /// Who answered the handshake.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Capabilities the server advertised.
    #[must_use]
    pub const fn server_capabilities(&self) -> &Capabilities {
        &self.server_caps
    }

    /// Whether the server advertised a capability.
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.server_caps.contains_key(name)
    }

    /// Negotiated protocol version.
    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Usage notes from the server.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// The identity this client sent.
    #[must_use]
    pub const fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    /// Whether the connection is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.transport.is_connected()
    }

    /// A framed summary of the connected server.
    ///
    /// ```text
    /// ══════════════════════════════════════════════════
    ///  Server Connected
    ///  Server: Context Server [1.0]
    ///  Instructions: None
    /// ══════════════════════════════════════════════════
    /// ```
    #[must_use]
    pub fn banner(&self) -> String {
        let rule = "═".repeat(50);
        format!(
            "{rule}\n Server Connected\n Server: {} [{}]\n Instructions: {}\n{rule}",
            self.server_info.name,
            self.server_info.version,
            self.instructions.as_deref().unwrap_or("None"),
        )
    }

    /// Receive notifications pushed by the server from now on.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    // =========================================================================
    // Session operations
    // =========================================================================

    /// Check the server is alive. Answers `"pong"`.
    pub async fn ping(&self, options: RequestOptions) -> Result<String, CtxError> {
        let params = OptionsParams { options: some(options) };
        self.request(methods::PING, &params, options).await
    }

    /// List the server's tools.
    pub async fn list_tools(
        &self,
        options: RequestOptions,
    ) -> Result<ListResponse<ToolMetadata>, CtxError> {
        let params = OptionsParams { options: some(options) };
        self.request(methods::TOOLS_LIST, &params, options).await
    }

    /// Call a tool with a serializable payload.
    ///
    /// # Errors
    ///
    /// [`CtxError::NotFound`] for an unknown tool, [`CtxError::HandlerFailure`]
    /// when the tool fails and [`CtxError::Timeout`] when `options.timeout`
    /// elapses first.
    pub async fn call_tool<A: Serialize + ?Sized>(
        &self,
        name: &str,
        arguments: &A,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CallParams::new(name, Some(serde_json::to_value(arguments)?), options);
        self.request(methods::TOOLS_CALL, &params, options).await
    }

    /// Call a tool with a raw JSON payload.
    ///
    /// The bytes must be a JSON document; an empty slice sends no payload.
    pub async fn call_tool_bytes(
        &self,
        name: &str,
        payload: &[u8],
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CallParams::new(name, decode_payload(methods::TOOLS_CALL, payload)?, options);
        self.request(methods::TOOLS_CALL, &params, options).await
    }

    /// List the server's resources.
    pub async fn list_resources(
        &self,
        options: RequestOptions,
    ) -> Result<ListResponse<ResourceMetadata>, CtxError> {
        let params = OptionsParams { options: some(options) };
        self.request(methods::RESOURCES_LIST, &params, options).await
    }

    /// Read a resource by name.
    pub async fn read_resource(
        &self,
        name: &str,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CallParams::new(name, None, options);
        self.request(methods::RESOURCES_READ, &params, options).await
    }

    /// Read a resource, passing it arguments.
    pub async fn read_resource_with<A: Serialize + ?Sized>(
        &self,
        name: &str,
        arguments: &A,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CallParams::new(name, Some(serde_json::to_value(arguments)?), options);
        self.request(methods::RESOURCES_READ, &params, options).await
    }

    /// Subscribe to updates of a resource URI.
    ///
    /// Updates arrive on [`notifications`](Self::notifications) as
    /// `notifications/resources/updated`.
    pub async fn subscribe_resource(
        &self,
        uri: &str,
        options: RequestOptions,
    ) -> Result<(), CtxError> {
        let params = UriParams {
            uri: uri.to_string(),
            options: some(options),
        };
        self.request::<serde_json::Value>(methods::RESOURCES_SUBSCRIBE, &params, options)
            .await?;
        Ok(())
    }

    /// Stop receiving updates of a resource URI.
    pub async fn unsubscribe_resource(
        &self,
        uri: &str,
        options: RequestOptions,
    ) -> Result<(), CtxError> {
        let params = UriParams {
            uri: uri.to_string(),
            options: some(options),
        };
        self.request::<serde_json::Value>(methods::RESOURCES_UNSUBSCRIBE, &params, options)
            .await?;
        Ok(())
    }

    /// List the server's prompts.
    pub async fn list_prompts(
        &self,
        options: RequestOptions,
    ) -> Result<ListResponse<PromptMetadata>, CtxError> {
        let params = OptionsParams { options: some(options) };
        self.request(methods::PROMPTS_LIST, &params, options).await
    }

    /// Render a prompt with its arguments.
    pub async fn get_prompt<A: Serialize + ?Sized>(
        &self,
        name: &str,
        arguments: &A,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CallParams::new(name, Some(serde_json::to_value(arguments)?), options);
        self.request(methods::PROMPTS_GET, &params, options).await
    }

    /// Set the level below which the server stops sending log messages.
    pub async fn set_logging_level(
        &self,
        level: LoggingLevel,
        options: RequestOptions,
    ) -> Result<(), CtxError> {
        let params = SetLevelParams {
            level,
            options: some(options),
        };
        self.request::<serde_json::Value>(methods::LOGGING_SET_LEVEL, &params, options)
            .await?;
        Ok(())
    }

    /// Ask the server's completion handler for suggestions.
    pub async fn complete<A: Serialize + ?Sized>(
        &self,
        arguments: &A,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        let params = CompleteParams {
            arguments: Some(serde_json::to_value(arguments)?),
            options: some(options),
        };
        self.request(methods::COMPLETION_COMPLETE, &params, options).await
    }

    /// Tell the server the client's roots changed. Nothing is returned.
    pub async fn send_roots_list_changed(&self) -> Result<(), CtxError> {
        self.ensure_connected()?;
        trace!("sending roots list changed");
        self.transport
            .send(Notification::new(notifications::ROOTS_LIST_CHANGED).into())
            .await
            .map_err(Into::into)
    }

    /// Close the connection.
    ///
    /// Calls still waiting for a response fail with a transport error.
    pub async fn close(self) -> Result<(), CtxError> {
        debug!("closing client connection");
        self.running.store(false, Ordering::SeqCst);
        let result = self.transport.close().await.map_err(Into::into);
        self.router.abort();
        self.pending.write().await.clear();
        result
    }

    // =========================================================================
    // Correlation
    // =========================================================================

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn ensure_connected(&self) -> Result<(), CtxError> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CtxError::transport(
                TransportErrorKind::ConnectionClosed,
                "client is not connected",
            ))
        }
    }

    /// Send a request and wait for its response. When `options.timeout` is
    /// set the wait is bounded on this side too, so a server that never
    /// answers still fails the call.
    async fn request<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: &impl Serialize,
        options: RequestOptions,
    ) -> Result<R, CtxError> {
        self.ensure_connected()?;

        let id = self.next_request_id();
        let request = Request::with_params(method, id.clone(), serde_json::to_value(params)?);
        trace!(id = %id, method, "sending request");

        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(id.clone(), tx);

        if let Err(e) = self.transport.send(Message::Request(request)).await {
            self.pending.write().await.remove(&id);
            return Err(e.into());
        }

        let received = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.write().await.remove(&id);
                    debug!(id = %id, method, ?limit, "request timed out");
                    return Err(CtxError::timeout(method, limit));
                }
            },
            None => rx.await,
        };
        let response = received.map_err(|_| {
            CtxError::transport(
                TransportErrorKind::ConnectionClosed,
                "connection closed before the response arrived",
            )
        })?;

        let result = response.into_result()?;
        serde_json::from_value(result).map_err(|e| {
            CtxError::internal_with_source(format!("unexpected result for '{method}'"), e)
        })
    }
}

impl<T: Transport> Drop for ContextClient<T> {
    fn drop(&mut self) {
        self.router.abort();
    }
}

impl<T: Transport> std::fmt::Debug for ContextClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextClient")
            .field("server_info", &self.server_info)
            .field("protocol_version", &self.protocol_version)
            .field("client_info", &self.client_info)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn some(options: RequestOptions) -> Option<RequestOptions> {
    (options != RequestOptions::default()).then_some(options)
}

fn decode_payload(method: &str, payload: &[u8]) -> Result<Option<serde_json::Value>, CtxError> {
    if payload.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(payload)
        .map(Some)
        .map_err(|e| CtxError::invalid_params(method, format!("payload is not JSON: {e}")))
}

/// Read messages until the connection ends, handing responses to their
/// callers and notifications to subscribers.
fn spawn_message_router<T>(
    transport: Arc<T>,
    pending: PendingMap,
    notifications: broadcast::Sender<Notification>,
    running: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()>
where
    T: Transport + 'static,
    T::Error: Into<CtxError>,
{
    tokio::spawn(async move {
        debug!("starting client message router");

        loop {
            match transport.recv().await {
                Ok(Some(Message::Response(response))) => route_response(response, &pending).await,
                Ok(Some(Message::Notification(notification))) => {
                    trace!(method = %notification.method(), "server notification");
                    // No receivers is fine.
                    let _ = notifications.send(notification);
                }
                Ok(Some(Message::Request(request))) => {
                    handle_server_request(request, transport.as_ref()).await;
                }
                Ok(None) => {
                    info!("connection closed by server");
                    break;
                }
                Err(e) => {
                    let err: CtxError = e.into();
                    if err.is_malformed_frame() {
                        warn!(error = %err, "skipping malformed frame from server");
                        continue;
                    }
                    error!(error = %err, "transport error in message router");
                    break;
                }
            }
        }

        running.store(false, Ordering::SeqCst);
        // Dropping the senders fails every waiting call.
        pending.write().await.clear();
        debug!("message router stopped");
    })
}

async fn route_response(response: Response, pending: &PendingMap) {
    let sender = pending.write().await.remove(&response.id);
    match sender {
        Some(sender) => {
            trace!(id = %response.id, "routing response to pending request");
            if sender.send(response).is_err() {
                debug!("pending request receiver dropped");
            }
        }
        None => warn!(id = %response.id, "received response for unknown request"),
    }
}

async fn handle_server_request<T>(request: Request, transport: &T)
where
    T: Transport,
    T::Error: Into<CtxError>,
{
    let response = if request.method() == methods::PING {
        Response::success(request.id.clone(), serde_json::json!("pong"))
    } else {
        warn!(method = %request.method(), "unknown server request method");
        Response::error(
            request.id.clone(),
            JsonRpcError::from(CtxError::method_not_found(request.method())),
        )
    };

    if let Err(e) = transport.send(Message::Response(response)).await {
        let err: CtxError = e.into();
        error!(error = %err, "failed to answer server request");
    }
}

/// Run the `initialize` handshake on a fresh transport.
///
/// Messages other than the handshake response are skipped. The server's
/// protocol version must be one this client supports.
pub(crate) async fn initialize<T>(
    transport: &T,
    request: &InitializeRequest,
) -> Result<InitializeResponse, CtxError>
where
    T: Transport,
    T::Error: Into<CtxError>,
{
    debug!(
        protocol_version = %request.protocol_version,
        supported_versions = ?SUPPORTED_PROTOCOL_VERSIONS,
        "initializing context session"
    );

    let init = Request::with_params(
        methods::INITIALIZE,
        INITIALIZE_ID,
        serde_json::to_value(request)?,
    );
    transport
        .send(Message::Request(init))
        .await
        .map_err(Into::into)?;

    let response = loop {
        match transport.recv().await {
            Ok(Some(Message::Response(r))) if r.id == RequestId::Number(INITIALIZE_ID) => break r,
            Ok(Some(other)) => trace!(?other, "skipping message during handshake"),
            Ok(None) => {
                return Err(CtxError::handshake_failed_with_versions(
                    "connection closed during initialization",
                    Some(request.protocol_version.clone()),
                    None,
                ));
            }
            Err(e) => {
                let err: CtxError = e.into();
                return Err(CtxError::handshake_failed_with_versions(
                    format!("transport error during initialization: {err}"),
                    Some(request.protocol_version.clone()),
                    None,
                ));
            }
        }
    };

    if let Some(error) = response.error {
        return Err(CtxError::handshake_failed_with_versions(
            error.message,
            Some(request.protocol_version.clone()),
            None,
        ));
    }

    let result: InitializeResponse = response
        .result
        .map(serde_json::from_value)
        .transpose()?
        .ok_or_else(|| CtxError::handshake_failed("empty initialize result"))?;

    let server_version = &result.protocol_version;
    if !is_version_supported(server_version) {
        warn!(
            server_version = %server_version,
            supported = ?SUPPORTED_PROTOCOL_VERSIONS,
            "server returned unsupported protocol version"
        );
        return Err(CtxError::handshake_failed_with_versions(
            format!(
                "unsupported protocol version: server returned '{server_version}', \
                 client supports {SUPPORTED_PROTOCOL_VERSIONS:?}"
            ),
            Some(request.protocol_version.clone()),
            Some(server_version.clone()),
        ));
    }

    transport
        .send(Notification::new(notifications::INITIALIZED).into())
        .await
        .map_err(Into::into)?;

    debug!(
        server = %result.server_info.name,
        protocol_version = %result.protocol_version,
        "initialization complete"
    );
    Ok(result)
}
