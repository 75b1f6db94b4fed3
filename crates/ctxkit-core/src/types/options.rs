//! Per-call options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings that travel with a single call.
///
/// On the wire the timeout is a number of seconds, fractional allowed:
/// `{"timeout": 0.25}`. A missing timeout means the call may take as long
/// as it needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Upper bound on how long the call may run.
    #[serde(default, with = "secs_f64", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options without a timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// Options with a timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

mod secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_as_seconds() {
        let options = RequestOptions::with_timeout(Duration::from_millis(1500));
        assert_eq!(serde_json::to_value(options).unwrap(), json!({"timeout": 1.5}));

        let back: RequestOptions = serde_json::from_value(json!({"timeout": 0})).unwrap();
        assert_eq!(back.timeout, Some(Duration::ZERO));
    }

    #[test]
    fn test_missing_timeout() {
        assert_eq!(serde_json::to_value(RequestOptions::new()).unwrap(), json!({}));
        let back: RequestOptions = serde_json::from_value(json!({})).unwrap();
        assert!(back.timeout.is_none());
    }

    #[test]
    fn test_negative_timeout_rejected() {
        assert!(serde_json::from_value::<RequestOptions>(json!({"timeout": -1.0})).is_err());
    }
}
