//! State shared by every session of one server.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ctxkit_core::protocol::notifications;
use ctxkit_core::types::ResourceUpdatedParams;
use ctxkit_core::{Capabilities, CapabilityConfig, Notification};

use crate::config::ServerConfig;
use crate::handler::Completion;
use crate::peer::Peer;
use crate::registry::{PromptRegistry, ResourceRegistry, ToolRegistry};
use crate::subscriptions::{SessionId, Subscriptions};

/// Registries, subscriptions and connected peers of a server.
pub struct ServerState {
    config: ServerConfig,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    completion: RwLock<Option<Arc<dyn Completion>>>,
    subscriptions: Subscriptions,
    peers: RwLock<HashMap<SessionId, Arc<dyn Peer>>>,
}

impl ServerState {
    /// Create empty state.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
            prompts: PromptRegistry::new(),
            completion: RwLock::new(None),
            subscriptions: Subscriptions::new(),
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Resource registry.
    #[must_use]
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Prompt registry.
    #[must_use]
    pub const fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Subscription table.
    #[must_use]
    pub const fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// The installed completion handler.
    #[must_use]
    pub fn completion(&self) -> Option<Arc<dyn Completion>> {
        self.completion
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install the completion handler, replacing any previous one.
    pub fn set_completion(&self, completion: Arc<dyn Completion>) {
        *self.completion.write().unwrap_or_else(PoisonError::into_inner) = Some(completion);
    }

    /// Capabilities advertised in `initialize`.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert("tools".to_string(), CapabilityConfig::new());
        caps.insert(
            "resources".to_string(),
            CapabilityConfig::new().with_setting("subscribe", "true"),
        );
        caps.insert("prompts".to_string(), CapabilityConfig::new());
        caps.insert("logging".to_string(), CapabilityConfig::new());
        if self.completion().is_some() {
            caps.insert("completions".to_string(), CapabilityConfig::new());
        }
        caps
    }

    pub(crate) fn attach_peer(&self, session: SessionId, peer: Arc<dyn Peer>) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, peer);
    }

    pub(crate) fn detach(&self, session: SessionId) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session);
        self.subscriptions.remove_session(session);
    }

    /// Number of sessions with an attached peer.
    #[must_use]
    pub fn connected_sessions(&self) -> usize {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Push `notifications/resources/updated` to every subscriber of `uri`.
    ///
    /// Returns how many sessions were notified. Delivery failures are
    /// logged and skipped.
    pub async fn notify_resource_updated(&self, uri: &str) -> usize {
        let uri = normalize_uri(uri);
        let targets: Vec<Arc<dyn Peer>> = {
            let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
            self.subscriptions
                .subscribers(&uri)
                .iter()
                .filter_map(|id| peers.get(id).cloned())
                .collect()
        };

        let params = match serde_json::to_value(ResourceUpdatedParams { uri: uri.clone() }) {
            Ok(params) => params,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "failed to encode resource update");
                return 0;
            }
        };

        let mut delivered = 0;
        for peer in targets {
            let notification =
                Notification::with_params(notifications::RESOURCES_UPDATED, params.clone());
            match peer.notify(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        uri = %uri,
                        error = %e,
                        "failed to deliver resource update"
                    );
                }
            }
        }
        tracing::debug!(uri = %uri, delivered, "resource update fanned out");
        delivered
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("server_info", &self.config.server_info)
            .field("tools", &self.tools)
            .field("resources", &self.resources)
            .field("prompts", &self.prompts)
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

/// Canonical form of a resource URI, so `mem://a` and its parsed form
/// name the same subscription.
pub(crate) fn normalize_uri(uri: &str) -> String {
    url::Url::parse(uri).map_or_else(|_| uri.to_string(), String::from)
}
