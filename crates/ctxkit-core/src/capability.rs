//! Handshake types and capability maps.
//!
//! Capabilities are a plain map from capability name (`tools`, `resources`,
//! `logging`, ...) to a small bag of string settings. Both sides advertise
//! theirs during `initialize`; nothing else about them is enforced by the
//! protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::RequestOptions;

/// The protocol version this implementation prefers.
pub const PROTOCOL_VERSION: &str = "2025-02-17";

/// Every protocol version this implementation speaks, newest first.
///
/// ```
/// use ctxkit_core::capability::is_version_supported;
///
/// assert!(is_version_supported("2025-02-17"));
/// assert!(!is_version_supported("1.0.0"));
/// ```
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-02-17", "2024-11-05"];

/// Check whether a protocol version is supported.
#[must_use]
pub fn is_version_supported(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Pick the version a server answers with.
///
/// The requested version is echoed back when supported, otherwise the
/// server offers [`PROTOCOL_VERSION`] and the client decides whether it can
/// live with that.
///
/// ```
/// use ctxkit_core::capability::{negotiate_version, PROTOCOL_VERSION};
///
/// assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
/// assert_eq!(negotiate_version("0.1"), PROTOCOL_VERSION);
/// ```
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|&&v| v == requested)
        .copied()
        .unwrap_or(PROTOCOL_VERSION)
}

/// Settings for one capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Free-form settings, e.g. `subscribe = "true"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl CapabilityConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a setting.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Whether a setting is present and equal to `"true"`.
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        self.setting(key) == Some("true")
    }
}

/// Capability name to its settings.
pub type Capabilities = BTreeMap<String, CapabilityConfig>;

/// Identity of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Create server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new("Context Server", "1.0")
    }
}

/// Identity of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Create client info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new("Context Client", "1.0")
    }
}

/// Parameters of `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Version the client would like to speak.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Who is calling.
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
    /// What the client offers.
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Per-call options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

impl InitializeRequest {
    /// Create a request for the preferred protocol version.
    #[must_use]
    pub fn new(client_info: ClientInfo, capabilities: Capabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            client_info,
            capabilities,
            options: None,
        }
    }

    /// Attach request options.
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Result of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// Negotiated protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Who answered.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// What the server offers.
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Optional usage notes for the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResponse {
    /// Create a response for the preferred protocol version.
    #[must_use]
    pub fn new(server_info: ServerInfo, capabilities: Capabilities) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info,
            capabilities,
            instructions: None,
        }
    }

    /// Set instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Whether the server advertised a capability.
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_initialize_request_wire_shape() {
        let mut caps = Capabilities::new();
        caps.insert(
            "roots".to_string(),
            CapabilityConfig::new().with_setting("listChanged", "true"),
        );

        let request = InitializeRequest::new(ClientInfo::default(), caps);
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(
            value,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "clientInfo": {"name": "Context Client", "version": "1.0"},
                "capabilities": {"roots": {"settings": {"listChanged": "true"}}}
            })
        );
    }

    #[test]
    fn test_initialize_response_defaults() {
        let parsed: InitializeResponse = serde_json::from_value(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "s", "version": "0.1"}
        }))
        .unwrap();
        assert!(parsed.capabilities.is_empty());
        assert!(parsed.instructions.is_none());
    }

    #[test]
    fn test_capability_settings() {
        let config = CapabilityConfig::new().with_setting("subscribe", "true");
        assert!(config.is_enabled("subscribe"));
        assert!(!config.is_enabled("listChanged"));
        assert_eq!(config.setting("subscribe"), Some("true"));
    }

    #[test]
    fn test_negotiation() {
        for version in SUPPORTED_PROTOCOL_VERSIONS {
            assert_eq!(negotiate_version(version), *version);
        }
        assert_eq!(negotiate_version("2099-01-01"), PROTOCOL_VERSION);
    }
}
