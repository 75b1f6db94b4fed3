//! Prelude module for convenient imports.
//!
//! ```rust
//! use ctxkit::prelude::*;
//!
//! let config = ServerConfig::default().with_port(9000);
//! assert_eq!(config.address().to_string(), "127.0.0.1:9000");
//! ```

pub use ctxkit_core::prelude::*;

pub use ctxkit_transport::{Transport, TransportListener, TransportMetadata};

#[cfg(feature = "server")]
pub use ctxkit_server::prelude::*;

#[cfg(feature = "client")]
pub use ctxkit_client::prelude::*;
