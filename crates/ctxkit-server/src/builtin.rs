//! Ready-made handlers.

use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;

use bytes::Bytes;
use ctxkit_core::{Envelope, PromptMetadata, RequestOptions, ResourceMetadata, ToolMetadata};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

use crate::handler::{HandlerError, HandlerResult, Prompt, Resource, TypedTool};

const ECHO_GUIDE: &str = "\
# echo

Returns its input unchanged.

## Input

An object with a single `data` field holding a string:

```json
{ \"data\": \"Hello, World!\" }
```

## Output

The string from `data`.
";

/// Echoes `Envelope<String>` input back as the result.
///
/// Register it through [`Typed`](crate::handler::Typed):
///
/// ```rust
/// use ctxkit_server::builtin::EchoTool;
/// use ctxkit_server::handler::Typed;
/// use ctxkit_server::ToolRegistry;
/// use std::sync::Arc;
///
/// let tools = ToolRegistry::new();
/// tools.register(Arc::new(Typed(EchoTool))).unwrap();
/// assert_eq!(tools.names(), vec!["echo"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTool;

impl EchoTool {
    /// Registered name.
    pub const NAME: &'static str = "echo";
}

impl TypedTool for EchoTool {
    type Input = Envelope<String>;
    type Output = String;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(Self::NAME)
            .description("A tool that echoes the provided input.")
            .input_schema(json!({
                "type": "object",
                "properties": { "data": { "type": "string" } },
                "required": ["data"]
            }))
            .guide(ECHO_GUIDE)
    }

    async fn call(
        &self,
        input: Envelope<String>,
        _options: RequestOptions,
    ) -> Result<String, HandlerError> {
        Ok(input.into_inner())
    }
}

/// A resource backed by an async closure.
///
/// The payload decodes into `I`; the closure's output is rendered with
/// `Display`. Use `()` for `I` when reads take no arguments.
///
/// ```rust
/// use ctxkit_server::builtin::FnResource;
/// use ctxkit_server::handler::HandlerError;
/// use url::Url;
///
/// let motd = FnResource::new(
///     "motd",
///     Url::parse("file:///etc/motd").unwrap(),
///     |(): ()| async { Ok::<_, HandlerError>("welcome") },
/// )
/// .mime_type("text/plain");
/// ```
pub struct FnResource<I, O, F> {
    metadata: ResourceMetadata,
    read: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> FnResource<I, O, F>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send,
{
    /// Create a resource.
    pub fn new(name: impl Into<String>, uri: Url, read: F) -> Self {
        Self {
            metadata: ResourceMetadata::new(name, uri),
            read,
            _marker: PhantomData,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata = self.metadata.description(description);
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.metadata = self.metadata.mime_type(mime_type);
        self
    }
}

impl<I, O, F, Fut> Resource for FnResource<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Display + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
{
    fn metadata(&self) -> ResourceMetadata {
        self.metadata.clone()
    }

    fn invoke(&self, payload: Bytes, _options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
        let input = serde_json::from_slice::<I>(&payload);
        Box::pin(async move {
            let output = (self.read)(input?).await?;
            Ok(output.to_string())
        })
    }
}

/// A prompt rendered from a `{key}` template.
///
/// The payload is a JSON object; each `{key}` is replaced by the value of
/// `key` (strings as-is, anything else as JSON). `{{` and `}}` produce
/// literal braces. A placeholder without a matching argument fails the call.
///
/// ```rust
/// # tokio_test::block_on(async {
/// use bytes::Bytes;
/// use ctxkit_core::RequestOptions;
/// use ctxkit_server::builtin::TemplatePrompt;
/// use ctxkit_server::handler::Prompt;
///
/// let greet = TemplatePrompt::new("greet", "Say hello to {name}.");
/// let text = greet
///     .invoke(Bytes::from_static(br#"{"name":"Ada"}"#), RequestOptions::default())
///     .await
///     .unwrap();
/// assert_eq!(text, "Say hello to Ada.");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TemplatePrompt {
    metadata: PromptMetadata,
    template: String,
}

impl TemplatePrompt {
    /// Create a prompt.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            metadata: PromptMetadata::new(name),
            template: template.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata = self.metadata.description(description);
        self
    }

    /// Set the URI.
    #[must_use]
    pub fn uri(mut self, uri: Url) -> Self {
        self.metadata = self.metadata.uri(uri);
        self
    }

    /// The raw template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Fill the template from an argument map.
    pub fn render(&self, arguments: &Map<String, Value>) -> Result<String, HandlerError> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                return Err(HandlerError::failed("unmatched '}' in template"));
            }

            let Some(end) = tail.find('}') else {
                return Err(HandlerError::failed("unterminated placeholder in template"));
            };
            let key = &tail[1..end];
            match arguments.get(key) {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => return Err(HandlerError::failed(format!("missing argument '{key}'"))),
            }
            rest = &tail[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl Prompt for TemplatePrompt {
    fn metadata(&self) -> PromptMetadata {
        self.metadata.clone()
    }

    fn invoke(&self, payload: Bytes, _options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let arguments = match serde_json::from_slice::<Value>(&payload)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(HandlerError::failed(format!(
                        "prompt arguments must be an object, got {other}"
                    )));
                }
            };
            self.render(&arguments)
        })
    }
}
