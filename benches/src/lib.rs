//! Benchmarks for ctxkit.
//!
//! - **registry**: register, lookup and listing on a populated registry
//! - **dispatch**: routing a request through a session, in-process and over
//!   the memory transport
//!
//! ```bash
//! cargo bench --package ctxkit-benches
//! cargo bench --package ctxkit-benches --bench registry
//! cargo bench --package ctxkit-benches -- --sample-size 10
//! ```

use std::sync::Arc;

use bytes::Bytes;
use ctxkit_core::{RequestOptions, ToolMetadata};
use ctxkit_server::builtin::EchoTool;
use ctxkit_server::{HandlerResult, Tool, ToolRegistry, Typed};
use futures::future::BoxFuture;

/// A tool that answers with a fixed string.
#[derive(Debug, Clone)]
pub struct Fixed {
    name: String,
}

impl Fixed {
    /// Create a tool named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Tool for Fixed {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(self.name.clone())
    }

    fn invoke(&self, _payload: Bytes, _options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
        Box::pin(futures::future::ready(Ok(self.name.clone())))
    }
}

/// A tool registry with `echo` and `count` numbered filler tools.
#[must_use]
pub fn populated_registry(count: usize) -> ToolRegistry {
    let registry = ToolRegistry::new();
    let _ = registry.register(Arc::new(Typed(EchoTool)));
    for n in 0..count {
        let _ = registry.register(Arc::new(Fixed::new(format!("tool-{n:04}"))));
    }
    registry
}
