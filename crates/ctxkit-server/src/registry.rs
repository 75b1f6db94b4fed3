//! Name-keyed handler registries.
//!
//! One [`Registry`] per handler kind. Names are unique within a registry;
//! registering a taken name fails with [`CtxError::DuplicateRegistration`]
//! and leaves the existing handler in place.
//!
//! Listing is ascending by name and is computed fresh on every call from a
//! consistent snapshot, so registrations racing with a listing either show
//! up whole or not at all.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use ctxkit_core::{CtxError, HandlerKind, Identifiable, ListResponse};

use crate::handler::{Handler, Prompt, Resource, Tool};

/// Registry of tools.
pub type ToolRegistry = Registry<dyn Tool>;
/// Registry of resources.
pub type ResourceRegistry = Registry<dyn Resource>;
/// Registry of prompts.
pub type PromptRegistry = Registry<dyn Prompt>;

/// A thread-safe name to handler map.
pub struct Registry<H: ?Sized> {
    entries: RwLock<BTreeMap<String, Arc<H>>>,
}

impl<H: ?Sized + Handler> Registry<H> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a registry from an initial list, failing on the first
    /// duplicate name.
    pub fn with_handlers(handlers: impl IntoIterator<Item = Arc<H>>) -> Result<Self, CtxError> {
        let registry = Self::new();
        for handler in handlers {
            registry.register(handler)?;
        }
        Ok(registry)
    }

    /// Which kind of handler this registry holds.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        H::KIND
    }

    /// Register a handler under its metadata name.
    pub fn register(&self, handler: Arc<H>) -> Result<(), CtxError> {
        let name = handler.describe().id().to_string();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&name) {
            return Err(CtxError::duplicate(H::KIND, name));
        }
        tracing::debug!(kind = %H::KIND, name = %name, "registered handler");
        entries.insert(name, handler);
        Ok(())
    }

    /// Replace the whole registry with a new list.
    ///
    /// Duplicates within `handlers` fail the call and leave the current
    /// contents untouched.
    pub fn replace(&self, handlers: impl IntoIterator<Item = Arc<H>>) -> Result<(), CtxError> {
        let mut fresh = BTreeMap::new();
        for handler in handlers {
            let name = handler.describe().id().to_string();
            if fresh.contains_key(&name) {
                return Err(CtxError::duplicate(H::KIND, name));
            }
            fresh.insert(name, handler);
        }
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }

    /// Remove a handler, returning it if it was present.
    pub fn unregister(&self, name: &str) -> Option<Arc<H>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Look up a handler by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<H>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Look up a handler, failing with [`CtxError::NotFound`].
    pub fn require(&self, name: &str) -> Result<Arc<H>, CtxError> {
        self.lookup(name)
            .ok_or_else(|| CtxError::not_found(H::KIND, name))
    }

    /// First handler whose metadata satisfies `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&H::Metadata) -> bool) -> Option<Arc<H>> {
        self.snapshot()
            .into_iter()
            .find(|handler| predicate(&handler.describe()))
    }

    /// Metadata of every handler, ascending by name.
    #[must_use]
    pub fn list(&self) -> ListResponse<H::Metadata> {
        ListResponse::new(self.snapshot().iter().map(|h| h.describe()).collect())
    }

    /// Registered names, ascending.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Metadata is computed outside the lock so handlers can't stall writers.
    fn snapshot(&self) -> Vec<Arc<H>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl<H: ?Sized + Handler> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized + Handler> std::fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &H::KIND)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;
    use bytes::Bytes;
    use ctxkit_core::{RequestOptions, ToolMetadata};
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;

    struct Named(&'static str, &'static str);

    impl Tool for Named {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata::new(self.0).description(self.1)
        }

        fn invoke(
            &self,
            _payload: Bytes,
            _options: RequestOptions,
        ) -> BoxFuture<'_, HandlerResult> {
            Box::pin(async move { Ok(self.1.to_string()) })
        }
    }

    fn tool(name: &'static str, tag: &'static str) -> Arc<dyn Tool> {
        Arc::new(Named(name, tag))
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let registry = ToolRegistry::new();
        registry.register(tool("echo", "first")).unwrap();

        let err = registry.register(tool("echo", "second")).unwrap_err();
        assert!(matches!(
            err,
            CtxError::DuplicateRegistration { kind: HandlerKind::Tool, ref name } if name == "echo"
        ));

        let kept = registry.lookup("echo").unwrap();
        assert_eq!(kept.metadata().description.as_deref(), Some("first"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_returns_registered_instance() {
        let registry = ToolRegistry::new();
        let handler = tool("echo", "x");
        registry.register(Arc::clone(&handler)).unwrap();

        assert!(Arc::ptr_eq(&registry.lookup("echo").unwrap(), &handler));
        assert!(registry.lookup("nope").is_none());
        assert!(matches!(
            registry.require("nope"),
            Err(CtxError::NotFound { kind: HandlerKind::Tool, .. })
        ));
    }

    #[test]
    fn test_list_is_sorted_and_fresh() {
        let registry = ToolRegistry::with_handlers([tool("zeta", ""), tool("alpha", "")]).unwrap();
        assert_eq!(registry.list().ids(), vec!["alpha", "zeta"]);

        registry.register(tool("mid", "")).unwrap();
        let listing = registry.list();
        assert_eq!(listing.len(), registry.len());
        assert_eq!(listing.ids(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_replace_rejects_duplicates_atomically() {
        let registry = ToolRegistry::with_handlers([tool("keep", "")]).unwrap();
        let err = registry
            .replace([tool("a", ""), tool("a", "")])
            .unwrap_err();
        assert!(matches!(err, CtxError::DuplicateRegistration { .. }));
        assert_eq!(registry.names(), vec!["keep"]);

        registry.replace([tool("b", "")]).unwrap();
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn test_concurrent_registration_has_no_duplicates() {
        let registry = Arc::new(ToolRegistry::new());
        let names: Vec<&'static str> = vec!["a", "b", "c", "d", "e", "f", "g", "h"];

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let names = names.clone();
                std::thread::spawn(move || {
                    names
                        .into_iter()
                        .filter(|name| registry.register(tool(name, "")).is_ok())
                        .count()
                })
            })
            .collect();

        let inserted: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(inserted, names.len());
        assert_eq!(registry.list().ids(), names);
    }
}
