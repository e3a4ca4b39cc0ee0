// ── Runtime connection configuration ──
//
// These types describe *how* to reach the panel backend. They carry the
// API key and connection tuning, but never touch disk. The CLI builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default depth of the push-event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// Where to subscribe for live sensor updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// WebSocket URL of the push feed.
    pub url: Url,
    /// Topic sent in the subscribe frame.
    pub topic: String,
}

/// Configuration for one panel backend.
///
/// Built by the CLI, passed to `Controller`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Backend base URL (e.g., `http://osys.local:5000`).
    pub url: Url,
    /// Sent as `X-API-KEY`. `None` for backends without auth.
    pub api_key: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Live update feed. `None` disables live updates.
    pub push: Option<PushConfig>,
    /// Bounded queue between the push reader and the reconciler.
    pub event_queue_capacity: usize,
}

impl ControllerConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            api_key: None,
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
            push: None,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}
