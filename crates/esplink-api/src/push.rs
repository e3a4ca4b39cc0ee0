//! Push feed with auto-reconnect.
//!
//! Connects to the backend's WebSocket, subscribes to a topic and forwards
//! every `{operation, data}` frame into a bounded [`tokio::sync::mpsc`]
//! queue. Sends are awaited, so a slow consumer slows the reader instead
//! of losing events. Handles reconnection with exponential backoff +
//! jitter automatically, re-subscribing after each reconnect.
//!
//! # Example
//!
//! ```rust,ignore
//! use esplink_api::push::{PushFeed, ReconnectConfig};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let (tx, mut rx) = mpsc::channel(256);
//! let url = Url::parse("ws://osys.local:5000/ws")?;
//! let feed = PushFeed::spawn(url, "ESPHome".into(), ReconnectConfig::default(),
//!     CancellationToken::new(), None, tx);
//!
//! while let Some(msg) = rx.recv().await {
//!     println!("{}: {}", msg.operation, msg.data);
//! }
//! feed.join().await;
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::transport::API_KEY_HEADER;

// ── PushMessage ──────────────────────────────────────────────────────

/// One frame from the push feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Operation tag, e.g. `"sensor_update"`.
    pub operation: String,
    /// Operation payload, opaque at this layer.
    #[serde(default)]
    pub data: serde_json::Value,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push-feed reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── PushFeed ─────────────────────────────────────────────────────────

/// Handle to a running push-feed task.
pub struct PushFeed {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Why a single connection ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Disconnect {
    /// Server closed or the stream ended; reconnect.
    Remote,
    /// Cancelled, or the consumer dropped its receiver; stop.
    Stop,
}

impl PushFeed {
    /// Spawn the connect/read/reconnect loop.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// spawned task. The loop ends when `cancel` fires or when the
    /// receiving half of `tx` is dropped.
    pub fn spawn(
        url: Url,
        topic: String,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        api_key: Option<String>,
        tx: mpsc::Sender<PushMessage>,
    ) -> Self {
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            push_loop(url, topic, tx, reconnect, task_cancel, api_key).await;
        });
        Self { cancel, task }
    }

    /// Shut down and wait for the task to finish.
    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "push feed task panicked");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

async fn push_loop(
    url: Url,
    topic: String,
    tx: mpsc::Sender<PushMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    api_key: Option<String>,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &topic, &tx, &cancel, api_key.as_deref()) => result,
        };

        match result {
            Ok(Disconnect::Stop) => break,
            Ok(Disconnect::Remote) => {
                tracing::info!("push feed disconnected cleanly, reconnecting");
                attempt = 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "push feed error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(max_retries = max, "push feed reconnection limit reached, giving up");
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before reconnect"
                );

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }

                attempt = attempt.saturating_add(1);
            }
        }
    }

    tracing::debug!("push feed loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    url: &Url,
    topic: &str,
    tx: &mpsc::Sender<PushMessage>,
    cancel: &CancellationToken,
    api_key: Option<&str>,
) -> Result<Disconnect, Error> {
    tracing::info!(url = %url, "connecting to push feed");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(key) = api_key {
        request = request.with_header(API_KEY_HEADER, key);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    write
        .send(tungstenite::Message::text(subscribe_frame(topic)))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!(topic, "push feed connected");

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(Disconnect::Stop),
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(tungstenite::Message::Text(text))) => {
                let Some(msg) = parse_frame(&text) else {
                    continue;
                };
                // Awaiting here is the backpressure point.
                let sent = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Ok(Disconnect::Stop),
                    sent = tx.send(msg) => sent,
                };
                if sent.is_err() {
                    tracing::debug!("push consumer dropped, stopping feed");
                    return Ok(Disconnect::Stop);
                }
            }
            Some(Ok(tungstenite::Message::Ping(_))) => {
                tracing::trace!("push feed ping");
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                if let Some(cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "push feed close frame received");
                } else {
                    tracing::info!("push feed close frame received (no payload)");
                }
                return Ok(Disconnect::Remote);
            }
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => {
                tracing::info!("push feed stream ended");
                return Ok(Disconnect::Remote);
            }
            Some(Ok(_)) => {}
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

fn subscribe_frame(topic: &str) -> String {
    json!({ "command": "subscribe", "topic": topic }).to_string()
}

/// Parse a text frame; malformed frames are logged and skipped.
fn parse_frame(text: &str) -> Option<PushMessage> {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse push frame");
            None
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        assert!(d10 <= Duration::from_millis(12_500), "got {d10:?}");

        // Huge attempt counts must not overflow.
        let far = calculate_backoff(u32::MAX, &config);
        assert!(far <= Duration::from_millis(12_500), "got {far:?}");
    }

    #[test]
    fn subscribe_frame_names_topic() {
        let v: serde_json::Value = serde_json::from_str(&subscribe_frame("ESPHome")).unwrap();
        assert_eq!(v["command"], "subscribe");
        assert_eq!(v["topic"], "ESPHome");
    }

    #[test]
    fn parse_sensor_update_frame() {
        let msg = parse_frame(
            r#"{"operation":"sensor_update","data":{"device":"porch","sensor":"climate","key":"temperature","state":21.5}}"#,
        )
        .unwrap();
        assert_eq!(msg.operation, "sensor_update");
        assert_eq!(msg.data["device"], "porch");
        assert_eq!(msg.data["state"], 21.5);
    }

    #[test]
    fn frame_without_data_defaults_to_null() {
        let msg = parse_frame(r#"{"operation":"ping"}"#).unwrap();
        assert!(msg.data.is_null());
    }

    #[test]
    fn malformed_frames_are_skipped() {
        assert!(parse_frame("not json at all").is_none());
        assert!(parse_frame(r#"{"data":{}}"#).is_none());
    }

    #[tokio::test]
    async fn feed_stops_when_cancelled_before_connecting() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let feed = PushFeed::spawn(
            Url::parse("ws://127.0.0.1:9/ws").unwrap(),
            "ESPHome".into(),
            ReconnectConfig::default(),
            cancel,
            None,
            tx,
        );
        tokio::time::timeout(Duration::from_secs(5), feed.join())
            .await
            .unwrap();
    }
}
