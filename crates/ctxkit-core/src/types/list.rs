//! Listing results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Something listed by name.
pub trait Identifiable {
    /// The identifier shown in listings.
    fn id(&self) -> &str;
}

/// One page of a listing.
///
/// Servers return every handler in a single page, so `next` is `None` in
/// practice; it stays on the wire as the cursor of a following page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Listed items.
    pub results: Vec<T>,
    /// Id of the first item of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> ListResponse<T> {
    /// A final page.
    #[must_use]
    pub fn new(results: Vec<T>) -> Self {
        Self {
            results,
            next: None,
        }
    }

    /// Set the cursor of the next page.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }
}

impl<T: Identifiable> ListResponse<T> {
    /// Ids of the listed items, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(Identifiable::id).collect()
    }

    /// Find an item by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&T> {
        self.results.iter().find(|item| item.id() == id)
    }
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> IntoIterator for ListResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<T: Identifiable> fmt::Display for ListResponse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ids().join(", "))
    }
}
