//! Handler traits for tools, resources and prompts.
//!
//! Every handler takes an opaque JSON payload and answers with a string.
//! The session dispatches on name only and never sees a handler's concrete
//! input or output types; handlers decode their own payloads.
//!
//! Tools with a natural Rust input type can implement [`TypedTool`] instead
//! and be registered through the [`Typed`] adapter, which derives the input
//! schema and does the decoding.

use std::fmt::Display;
use std::future::Future;

use bytes::Bytes;
use ctxkit_core::types::schema_of;
use ctxkit_core::{HandlerKind, PromptMetadata, RequestOptions, ResourceMetadata, ToolMetadata};
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure raised inside a handler.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The payload did not decode into the handler's input type.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    /// The handler ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// Any other error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap an arbitrary error.
    pub fn other<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Result type returned by handler invocations.
pub type HandlerResult = Result<String, HandlerError>;

/// A callable tool.
///
/// ```rust
/// use bytes::Bytes;
/// use ctxkit_core::{RequestOptions, ToolMetadata};
/// use ctxkit_server::handler::{HandlerResult, Tool};
/// use futures::future::BoxFuture;
///
/// struct Shout;
///
/// impl Tool for Shout {
///     fn metadata(&self) -> ToolMetadata {
///         ToolMetadata::new("shout").description("Upper-cases a JSON string")
///     }
///
///     fn invoke(&self, payload: Bytes, _options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
///         Box::pin(async move {
///             let text: String = serde_json::from_slice(&payload)?;
///             Ok(text.to_uppercase())
///         })
///     }
/// }
/// ```
pub trait Tool: Send + Sync + 'static {
    /// Describe the tool for `tools/list`.
    fn metadata(&self) -> ToolMetadata;

    /// Run the tool on a JSON payload.
    fn invoke(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult>;
}

/// A readable resource.
pub trait Resource: Send + Sync + 'static {
    /// Describe the resource for `resources/list`.
    fn metadata(&self) -> ResourceMetadata;

    /// Read the resource. The payload carries optional read arguments.
    fn invoke(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult>;
}

/// A prompt template.
pub trait Prompt: Send + Sync + 'static {
    /// Describe the prompt for `prompts/list`.
    fn metadata(&self) -> PromptMetadata;

    /// Render the prompt from its arguments.
    fn invoke(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult>;
}

/// Answers `completion/complete`.
pub trait Completion: Send + Sync + 'static {
    /// Produce a completion for the payload.
    fn complete(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult>;
}

/// A type-erased handler as stored in a [`Registry`](crate::Registry).
///
/// Implemented for `dyn Tool`, `dyn Resource` and `dyn Prompt`.
pub trait Handler: Send + Sync {
    /// Metadata record listed for this kind.
    type Metadata: ctxkit_core::Identifiable + Clone + Send;

    /// Which registry the handler belongs in.
    const KIND: HandlerKind;

    /// The handler's metadata.
    fn describe(&self) -> Self::Metadata;

    /// Run the handler.
    fn call(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult>;
}

macro_rules! erase_handler {
    ($trait:ident, $meta:ty, $kind:expr) => {
        impl Handler for dyn $trait {
            type Metadata = $meta;
            const KIND: HandlerKind = $kind;

            fn describe(&self) -> $meta {
                self.metadata()
            }

            fn call(
                &self,
                payload: Bytes,
                options: RequestOptions,
            ) -> BoxFuture<'_, HandlerResult> {
                self.invoke(payload, options)
            }
        }
    };
}

erase_handler!(Tool, ToolMetadata, HandlerKind::Tool);
erase_handler!(Resource, ResourceMetadata, HandlerKind::Resource);
erase_handler!(Prompt, PromptMetadata, HandlerKind::Prompt);

/// A tool with typed input and output.
pub trait TypedTool: Send + Sync + 'static {
    /// Decoded payload type.
    type Input: DeserializeOwned + JsonSchema + Send;
    /// Result type, rendered with `Display`.
    type Output: Display;

    /// Describe the tool. A missing input schema is derived from `Input`.
    fn metadata(&self) -> ToolMetadata;

    /// Run the tool.
    fn call(
        &self,
        input: Self::Input,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Self::Output, HandlerError>> + Send;
}

/// Adapter exposing a [`TypedTool`] as a [`Tool`].
#[derive(Debug, Clone, Default)]
pub struct Typed<T>(pub T);

impl<T: TypedTool> Typed<T> {
    /// Wrap a typed tool.
    pub const fn new(tool: T) -> Self {
        Self(tool)
    }
}

impl<T: TypedTool> Tool for Typed<T> {
    fn metadata(&self) -> ToolMetadata {
        let metadata = self.0.metadata();
        if metadata.input_schema.is_some() {
            metadata
        } else {
            metadata.input_schema(schema_of::<T::Input>())
        }
    }

    fn invoke(&self, payload: Bytes, options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let input: T::Input = serde_json::from_slice(&payload)?;
            let output = self.0.call(input, options).await?;
            Ok(output.to_string())
        })
    }
}
