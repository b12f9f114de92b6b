//! Client configuration supplied by the embedding application.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for a [`Dispatcher`](crate::Dispatcher) over [`HttpTransport`](crate::transport::HttpTransport)
///
/// Every field except `base_url` is optional. Timeouts are in milliseconds;
/// an absent timeout leaves the transport default in place.
///
/// ```
/// use courier_fabric::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{ "base_url": "https://api.example.com/", "request_timeout_ms": 5000 }"#,
/// ).unwrap();
/// assert_eq!(config.base_url().unwrap(), "https://api.example.com");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub pool_idle_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the base URL is blank or not an
    /// absolute `http(s)` URL.
    pub fn base_url(&self) -> Result<&str> {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base_url must be an http(s) URL, got {base:?}"
            )));
        }
        Ok(base)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_ms.map(Duration::from_millis)
    }
}
