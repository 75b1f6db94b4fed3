//! Single-field payload wrapper.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Wraps a bare value as `{"data": value}`.
///
/// Handlers that take a plain string or number still get an object-shaped
/// payload with a describable schema.
///
/// ```rust
/// use ctxkit_core::Envelope;
///
/// let bytes = serde_json::to_vec(&Envelope::new(42)).unwrap();
/// let back: Envelope<i32> = serde_json::from_slice(&bytes).unwrap();
/// assert_eq!(back.into_inner(), 42);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Envelope<T> {
    /// The wrapped value.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wrap a value.
    pub const fn new(data: T) -> Self {
        Self { data }
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(data: T) -> Self {
        Self { data }
    }
}
