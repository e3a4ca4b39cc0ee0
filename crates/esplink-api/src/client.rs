// Panel backend HTTP client
//
// Wraps `reqwest::Client` with base-URL path joining, status mapping and
// body decoding. Endpoint groups (devices, objects) are implemented as
// inherent methods in sibling files to keep this module focused on
// transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest body excerpt carried in error messages.
const BODY_PREVIEW_LEN: usize = 200;

/// Device-panel route namespace, relative to the base URL.
const NAMESPACE: &str = "api/ESPHome";

/// Raw HTTP client for the device-panel backend.
///
/// All methods return decoded payloads; status codes and the backend's
/// `{"status": "error"}` replies are turned into [`Error`] before the
/// caller sees them.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PanelClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root (e.g. `http://osys.local:5000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join a path onto the base URL: `{base}/{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Build a namespaced URL: `{base}/{namespace}/{path}`.
    pub(crate) fn ns_url(&self, path: &str) -> Result<Url, Error> {
        self.url(&format!("{NAMESPACE}/{path}"))
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        parse_body(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        parse_body(resp).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        parse_body(resp).await
    }
}

/// Map the HTTP status, then decode the body as `T`.
async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("API key rejected (HTTP {})", status.as_u16()),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let body = resp.text().await?;
    if body.trim().is_empty() {
        return decode("null");
    }
    decode(&body)
}

/// Decode a JSON body, keeping a preview for diagnostics.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> PanelClient {
        PanelClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn ns_url_joins_without_double_slashes() {
        let c = client("http://panel.local:5000/");
        assert_eq!(
            c.ns_url("devices").unwrap().as_str(),
            "http://panel.local:5000/api/ESPHome/devices"
        );
    }

    #[test]
    fn ns_url_keeps_base_path_prefix() {
        let c = client("http://panel.local/home");
        assert_eq!(
            c.ns_url("device").unwrap().as_str(),
            "http://panel.local/home/api/ESPHome/device"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(preview(&body).chars().count(), BODY_PREVIEW_LEN);
    }

    #[test]
    fn decode_error_keeps_body() {
        let err = decode::<Vec<u32>>("not json").unwrap_err();
        match err {
            Error::Deserialization { body, .. } => assert_eq!(body, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
