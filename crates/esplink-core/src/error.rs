// ── Core error types ──
//
// User-facing errors from esplink-core. Consumers never see HTTP status
// codes or JSON parse failures directly. The `From<esplink_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Sensor not found: {sensor} on device {device}")]
    SensorNotFound { device: String, sensor: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::SensorNotFound { .. } | Self::Api { status: Some(404), .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<esplink_api::Error> for CoreError {
    fn from(err: esplink_api::Error) -> Self {
        match err {
            esplink_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            esplink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            esplink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            esplink_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            esplink_api::Error::Http { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            esplink_api::Error::Rejected { message } => CoreError::Rejected { message },
            esplink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            esplink_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("push feed connection failed: {reason}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_rejection_stays_a_rejection() {
        let err: CoreError = esplink_api::Error::Rejected {
            message: "Host and name are required".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Rejected { .. }));
    }

    #[test]
    fn http_404_is_not_found() {
        let err: CoreError = esplink_api::Error::Http {
            status: 404,
            message: "Device not found".into(),
        }
        .into();
        assert!(err.is_not_found());
    }
}
