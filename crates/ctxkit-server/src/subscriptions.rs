//! Resource subscriptions: URI to the set of subscribed sessions.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

/// Identity of one session.
pub type SessionId = Uuid;

/// Who is subscribed to which resource.
#[derive(Debug, Default)]
pub struct Subscriptions {
    by_uri: RwLock<HashMap<String, HashSet<SessionId>>>,
}

impl Subscriptions {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a session. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, uri: &str, session: SessionId) -> bool {
        self.by_uri
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uri.to_string())
            .or_default()
            .insert(session)
    }

    /// Unsubscribe a session. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, uri: &str, session: SessionId) -> bool {
        let mut by_uri = self.by_uri.write().unwrap_or_else(PoisonError::into_inner);
        let Some(sessions) = by_uri.get_mut(uri) else {
            return false;
        };
        let removed = sessions.remove(&session);
        if sessions.is_empty() {
            by_uri.remove(uri);
        }
        removed
    }

    /// Sessions subscribed to a URI.
    #[must_use]
    pub fn subscribers(&self, uri: &str) -> Vec<SessionId> {
        self.by_uri
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a session is subscribed to a URI.
    #[must_use]
    pub fn is_subscribed(&self, uri: &str, session: SessionId) -> bool {
        self.by_uri
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .is_some_and(|sessions| sessions.contains(&session))
    }

    /// Drop every subscription held by a session.
    pub fn remove_session(&self, session: SessionId) {
        self.by_uri
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, sessions| {
                sessions.remove(&session);
                !sessions.is_empty()
            });
    }

    /// Number of URIs with at least one subscriber.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uri.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nobody is subscribed to anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_unsubscribe() {
        let subs = Subscriptions::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(subs.subscribe("mem://x", a));
        assert!(!subs.subscribe("mem://x", a));
        assert!(subs.subscribe("mem://x", b));
        assert_eq!(subs.subscribers("mem://x").len(), 2);

        assert!(subs.unsubscribe("mem://x", a));
        assert!(!subs.unsubscribe("mem://x", a));
        assert!(!subs.unsubscribe("mem://unknown", a));
        assert_eq!(subs.subscribers("mem://x"), vec![b]);
    }

    #[test]
    fn test_remove_session_clears_empty_uris() {
        let subs = Subscriptions::new();
        let a = Uuid::new_v4();
        subs.subscribe("mem://x", a);
        subs.subscribe("mem://y", a);
        assert_eq!(subs.len(), 2);

        subs.remove_session(a);
        assert!(subs.is_empty());
        assert!(!subs.is_subscribed("mem://x", a));
    }
}
