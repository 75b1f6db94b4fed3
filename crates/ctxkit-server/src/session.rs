//! The per-connection protocol endpoint.
//!
//! A [`Session`] moves through three states:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --close--> Closed
//! ```
//!
//! Before the handshake only `initialize` and `ping` are accepted; every
//! other operation fails with [`CtxError::NotInitialized`]. A second
//! `initialize` fails with [`CtxError::AlreadyInitialized`] and changes
//! nothing. Once closed, every call fails with [`CtxError::SessionClosed`].
//!
//! Handler invocations run on their own task. When the call carries a
//! timeout and it elapses, the task is aborted and the caller gets
//! [`CtxError::Timeout`] right away.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use ctxkit_core::protocol::{methods, notifications};
use ctxkit_core::types::LogMessageParams;
use ctxkit_core::{
    Capabilities, ClientInfo, CtxError, HandlerKind, InitializeRequest, InitializeResponse,
    ListResponse, LoggingLevel, Notification, PromptMetadata, RequestOptions, ResourceMetadata,
    ToolMetadata, is_version_supported,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::handler::{Handler, HandlerError, HandlerResult};
use crate::peer::Peer;
use crate::registry::Registry;
use crate::state::{ServerState, normalize_uri};
use crate::subscriptions::SessionId;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `initialize`.
    Uninitialized,
    /// Handshake completed.
    Initialized,
    /// Closed; every call fails.
    Closed,
}

/// What the client said about itself during `initialize`.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Client identity.
    pub info: ClientInfo,
    /// Client capabilities.
    pub capabilities: Capabilities,
    /// Negotiated protocol version.
    pub protocol_version: String,
}

/// One client's view of a server.
pub struct Session {
    id: SessionId,
    state: Arc<ServerState>,
    lifecycle: RwLock<SessionState>,
    client: RwLock<Option<ClientRecord>>,
    log_level: RwLock<LoggingLevel>,
    roots_changed: AtomicU64,
    peer: Option<Arc<dyn Peer>>,
}

impl Session {
    /// Create a session without an outbound channel.
    ///
    /// Log messages are still traced; resource updates are not delivered.
    #[must_use]
    pub fn new(state: Arc<ServerState>) -> Self {
        Self::build(state, None)
    }

    /// Create a session that can notify its client.
    #[must_use]
    pub fn with_peer(state: Arc<ServerState>, peer: Arc<dyn Peer>) -> Self {
        Self::build(state, Some(peer))
    }

    fn build(state: Arc<ServerState>, peer: Option<Arc<dyn Peer>>) -> Self {
        let id = Uuid::new_v4();
        if let Some(peer) = &peer {
            state.attach_peer(id, Arc::clone(peer));
        }
        Self {
            id,
            state,
            lifecycle: RwLock::new(SessionState::Uninitialized),
            client: RwLock::new(None),
            log_level: RwLock::new(LoggingLevel::default()),
            roots_changed: AtomicU64::new(0),
            peer,
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Shared server state.
    #[must_use]
    pub const fn server(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The client record, once initialized.
    #[must_use]
    pub fn client(&self) -> Option<ClientRecord> {
        self.client.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current advisory logging level.
    #[must_use]
    pub fn logging_level(&self) -> LoggingLevel {
        *self.log_level.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many `roots/list_changed` notifications arrived.
    #[must_use]
    pub fn roots_changed_count(&self) -> u64 {
        self.roots_changed.load(Ordering::Relaxed)
    }

    fn ensure_ready(&self, method: &str) -> Result<(), CtxError> {
        match self.state() {
            SessionState::Initialized => Ok(()),
            SessionState::Uninitialized => Err(CtxError::not_initialized(method)),
            SessionState::Closed => Err(CtxError::SessionClosed),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Complete the handshake.
    pub fn initialize(&self, request: InitializeRequest) -> Result<InitializeResponse, CtxError> {
        let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
        match *lifecycle {
            SessionState::Uninitialized => {}
            SessionState::Initialized => return Err(CtxError::AlreadyInitialized),
            SessionState::Closed => return Err(CtxError::SessionClosed),
        }

        let config = self.state.config();
        let protocol_version = if is_version_supported(&request.protocol_version) {
            request.protocol_version.clone()
        } else {
            config.protocol_version.clone()
        };

        tracing::info!(
            session = %self.id,
            client = %request.client_info.name,
            client_version = %request.client_info.version,
            requested = %request.protocol_version,
            negotiated = %protocol_version,
            "session initialized"
        );

        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(ClientRecord {
            info: request.client_info,
            capabilities: request.capabilities,
            protocol_version: protocol_version.clone(),
        });
        *lifecycle = SessionState::Initialized;

        Ok(InitializeResponse {
            protocol_version,
            server_info: config.server_info.clone(),
            capabilities: self.state.capabilities(),
            instructions: config.instructions.clone(),
        })
    }

    /// Close the session and drop its subscriptions.
    pub fn close(&self) {
        let mut lifecycle = self.lifecycle.write().unwrap_or_else(PoisonError::into_inner);
        if *lifecycle == SessionState::Closed {
            return;
        }
        *lifecycle = SessionState::Closed;
        self.state.detach(self.id);
        tracing::debug!(session = %self.id, "session closed");
    }

    /// Liveness probe; answers `"pong"` in any state but closed.
    pub fn ping(&self, _options: RequestOptions) -> Result<&'static str, CtxError> {
        if self.state() == SessionState::Closed {
            return Err(CtxError::SessionClosed);
        }
        Ok("pong")
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    /// List tools, ascending by name.
    pub fn list_tools(
        &self,
        _options: RequestOptions,
    ) -> Result<ListResponse<ToolMetadata>, CtxError> {
        self.ensure_ready(methods::TOOLS_LIST)?;
        Ok(self.state.tools().list())
    }

    /// Call a tool.
    pub async fn call_tool(
        &self,
        name: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        self.ensure_ready(methods::TOOLS_CALL)?;
        self.invoke(self.state.tools(), name, payload, options).await
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// List resources, ascending by name.
    pub fn list_resources(
        &self,
        _options: RequestOptions,
    ) -> Result<ListResponse<ResourceMetadata>, CtxError> {
        self.ensure_ready(methods::RESOURCES_LIST)?;
        Ok(self.state.resources().list())
    }

    /// Read a resource by name.
    pub async fn read_resource(
        &self,
        name: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        self.ensure_ready(methods::RESOURCES_READ)?;
        self.invoke(self.state.resources(), name, payload, options).await
    }

    /// Subscribe to updates of the resource with this URI.
    ///
    /// Fails with [`CtxError::NotFound`] when no resource has the URI.
    pub async fn subscribe_resource(
        &self,
        uri: &str,
        _options: RequestOptions,
    ) -> Result<(), CtxError> {
        self.ensure_ready(methods::RESOURCES_SUBSCRIBE)?;
        let uri = normalize_uri(uri);
        if self
            .state
            .resources()
            .find(|metadata| metadata.uri.as_str() == uri)
            .is_none()
        {
            return Err(CtxError::not_found(HandlerKind::Resource, uri));
        }
        if self.state.subscriptions().subscribe(&uri, self.id) {
            tracing::debug!(session = %self.id, uri = %uri, "subscribed");
        }
        Ok(())
    }

    /// Unsubscribe from a URI. Unknown URIs are accepted.
    pub async fn unsubscribe_resource(
        &self,
        uri: &str,
        _options: RequestOptions,
    ) -> Result<(), CtxError> {
        self.ensure_ready(methods::RESOURCES_UNSUBSCRIBE)?;
        let uri = normalize_uri(uri);
        if self.state.subscriptions().unsubscribe(&uri, self.id) {
            tracing::debug!(session = %self.id, uri = %uri, "unsubscribed");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------

    /// List prompts, ascending by name.
    pub fn list_prompts(
        &self,
        _options: RequestOptions,
    ) -> Result<ListResponse<PromptMetadata>, CtxError> {
        self.ensure_ready(methods::PROMPTS_LIST)?;
        Ok(self.state.prompts().list())
    }

    /// Render a prompt.
    pub async fn get_prompt(
        &self,
        name: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        self.ensure_ready(methods::PROMPTS_GET)?;
        self.invoke(self.state.prompts(), name, payload, options).await
    }

    // ------------------------------------------------------------------
    // Logging, completion, roots
    // ------------------------------------------------------------------

    /// Set the advisory logging level. Registries are not touched.
    pub async fn set_logging_level(
        &self,
        level: LoggingLevel,
        _options: RequestOptions,
    ) -> Result<(), CtxError> {
        self.ensure_ready(methods::LOGGING_SET_LEVEL)?;
        *self.log_level.write().unwrap_or_else(PoisonError::into_inner) = level;
        tracing::debug!(session = %self.id, level = %level, "logging level set");
        Ok(())
    }

    /// Ask the completion handler for a completion.
    ///
    /// Fails with [`CtxError::CapabilityNotSupported`] when none is installed.
    pub async fn complete(
        &self,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<String, CtxError> {
        self.ensure_ready(methods::COMPLETION_COMPLETE)?;
        let completion = self
            .state
            .completion()
            .ok_or_else(|| CtxError::capability_not_supported("completions"))?;

        let outcome = run_bounded(methods::COMPLETION_COMPLETE, options, async move {
            completion.complete(payload, options).await
        })
        .await?;

        outcome.map_err(|e| match e {
            HandlerError::InvalidInput(e) => {
                CtxError::invalid_params(methods::COMPLETION_COMPLETE, e.to_string())
            }
            other => CtxError::internal(format!("completion failed: {other}")),
        })
    }

    /// Record a `roots/list_changed` notification from the client.
    pub async fn on_roots_list_changed(&self) {
        if self.state() == SessionState::Closed {
            return;
        }
        let count = self.roots_changed.fetch_add(1, Ordering::Relaxed) + 1;
        self.log(LoggingLevel::Info, format!("client roots changed ({count} so far)"))
            .await;
    }

    /// Emit a log message on behalf of this session.
    ///
    /// Messages below the session's level are dropped. The rest are traced
    /// and, when a peer is attached, sent as `notifications/message`.
    /// Returns whether the message was emitted.
    pub async fn log(&self, level: LoggingLevel, message: impl Into<String>) -> bool {
        if level < self.logging_level() {
            return false;
        }
        let message = message.into();

        match level {
            LoggingLevel::Debug => tracing::debug!(session = %self.id, "{message}"),
            LoggingLevel::Info | LoggingLevel::Notice => {
                tracing::info!(session = %self.id, "{message}");
            }
            LoggingLevel::Warning => tracing::warn!(session = %self.id, "{message}"),
            _ => tracing::error!(session = %self.id, level = %level, "{message}"),
        }

        if let Some(peer) = &self.peer {
            let params = LogMessageParams {
                level,
                data: message,
            };
            match serde_json::to_value(params) {
                Ok(params) => {
                    let notification = Notification::with_params(notifications::MESSAGE, params);
                    if let Err(e) = peer.notify(notification).await {
                        tracing::debug!(
                            session = %self.id,
                            error = %e,
                            "log message not delivered"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to encode log message"),
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    async fn invoke<H>(
        &self,
        registry: &Registry<H>,
        name: &str,
        payload: Bytes,
        options: RequestOptions,
    ) -> Result<String, CtxError>
    where
        H: ?Sized + Handler + 'static,
    {
        let handler = registry.require(name)?;
        let operation = format!("{} '{name}'", H::KIND);
        tracing::trace!(session = %self.id, kind = %H::KIND, name = %name, "invoking handler");

        let outcome = run_bounded(&operation, options, async move {
            handler.call(payload, options).await
        })
        .await;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(
                    session = %self.id,
                    kind = %H::KIND,
                    name = %name,
                    error = %e,
                    "handler failed"
                );
                self.log(LoggingLevel::Error, format!("{operation} failed: {e}"))
                    .await;
                Err(CtxError::handler_failure(H::KIND, name, e.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.id,
                    kind = %H::KIND,
                    name = %name,
                    error = %e,
                    "handler timed out"
                );
                Err(e)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A connection task that is aborted never reaches `close`.
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("logging_level", &self.logging_level())
            .finish_non_exhaustive()
    }
}

/// Aborts the task when dropped, so a caller that stops waiting also stops
/// the work.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run `work` on its own task, bounded by the call's timeout.
///
/// A panicking handler surfaces as a [`HandlerError::Failed`].
async fn run_bounded<F>(
    operation: &str,
    options: RequestOptions,
    work: F,
) -> Result<HandlerResult, CtxError>
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(work));

    let joined = match options.timeout {
        Some(limit) => tokio::time::timeout(limit, &mut task.0)
            .await
            .map_err(|_| CtxError::timeout(operation, limit))?,
        None => (&mut task.0).await,
    };

    Ok(joined.unwrap_or_else(|e| {
        if e.is_panic() {
            Err(HandlerError::failed("handler panicked"))
        } else {
            Err(HandlerError::failed("handler was cancelled"))
        }
    }))
}
