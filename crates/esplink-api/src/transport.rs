// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the push feed share the API key and TLS settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Header the panel backend reads the API key from.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Sent as [`API_KEY_HEADER`] on every request when present.
    pub api_key: Option<SecretString>,
    /// Skip certificate verification (self-signed home servers).
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            api_key: None,
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("esplink/", env!("CARGO_PKG_VERSION")))
            .default_headers(self.default_headers()?);

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Headers injected into every request (currently just the API key).
    pub fn default_headers(&self) -> Result<HeaderMap, crate::error::Error> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let mut value = HeaderValue::from_str(key.expose_secret()).map_err(|_| {
                crate::error::Error::Authentication {
                    message: "API key contains characters not allowed in a header".into(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn no_api_key_means_no_header() {
        let headers = TransportConfig::default().default_headers().unwrap();
        assert!(headers.get(API_KEY_HEADER).is_none());
    }

    #[test]
    fn api_key_header_is_sensitive() {
        let config = TransportConfig {
            api_key: Some(SecretString::from("s3cret".to_string())),
            ..TransportConfig::default()
        };
        let headers = config.default_headers().unwrap();
        let value = headers.get(API_KEY_HEADER).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "s3cret");
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let config = TransportConfig {
            api_key: Some(SecretString::from("bad\nkey".to_string())),
            ..TransportConfig::default()
        };
        assert!(config.default_headers().is_err());
    }
}
