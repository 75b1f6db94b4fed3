//! Runtime-agnostic sync primitives.
//!
//! The memory transport and the client correlation table only need locks
//! that can be held across `.await`; `async-lock` provides them without
//! tying those pieces to Tokio.

/// Async mutex, safe to hold across await points.
pub use async_lock::Mutex as AsyncMutex;

/// Async read-write lock.
pub use async_lock::RwLock as AsyncRwLock;
