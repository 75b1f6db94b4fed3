//! Request and notification parameter objects.
//!
//! Handler payloads travel as the JSON value under `arguments`. The server
//! re-serializes that value and hands the bytes to the handler, so an
//! absent `arguments` reaches the handler as the document `null`.

use serde::{Deserialize, Serialize};

use super::logging::LoggingLevel;
use super::options::RequestOptions;

fn is_default_options(options: &Option<RequestOptions>) -> bool {
    options.is_none_or(|o| o == RequestOptions::default())
}

/// Parameters of methods that take only options (`ping`, `*/list`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsParams {
    /// Per-call options.
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: Option<RequestOptions>,
}

/// Parameters of `tools/call`, `resources/read` and `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    /// Handler name.
    pub name: String,
    /// Handler payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    /// Per-call options.
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: Option<RequestOptions>,
}

impl CallParams {
    /// Create call parameters.
    pub fn new(
        name: impl Into<String>,
        arguments: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            options: Some(options),
        }
    }

    /// The payload as bytes, `null` when absent.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        payload_bytes(self.arguments.as_ref())
    }
}

/// Parameters of `resources/subscribe` and `resources/unsubscribe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UriParams {
    /// Resource URI.
    pub uri: String,
    /// Per-call options.
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: Option<RequestOptions>,
}

/// Parameters of `logging/setLevel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLevelParams {
    /// New level.
    pub level: LoggingLevel,
    /// Per-call options.
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: Option<RequestOptions>,
}

/// Parameters of `completion/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteParams {
    /// Completion payload.
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
    /// Per-call options.
    #[serde(default, skip_serializing_if = "is_default_options")]
    pub options: Option<RequestOptions>,
}

impl CompleteParams {
    /// The payload as bytes, `null` when absent.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        payload_bytes(self.arguments.as_ref())
    }
}

/// Parameters of `notifications/resources/updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpdatedParams {
    /// URI of the changed resource.
    pub uri: String,
}

/// Parameters of `notifications/message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessageParams {
    /// Severity.
    pub level: LoggingLevel,
    /// Message text.
    pub data: String,
}

fn payload_bytes(arguments: Option<&serde_json::Value>) -> Vec<u8> {
    match arguments {
        Some(value) => value.to_string().into_bytes(),
        None => b"null".to_vec(),
    }
}
