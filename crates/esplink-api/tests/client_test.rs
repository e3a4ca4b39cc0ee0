#![allow(clippy::unwrap_used)]
// Integration tests for `PanelClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use esplink_api::{DeviceRecord, Error, PanelClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PanelClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PanelClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn draft(name: &str, host: &str) -> DeviceRecord {
    serde_json::from_value(json!({ "name": name, "host": host })).unwrap()
}

// ── Device listing ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "name": "porch",
            "host": "192.168.1.40",
            "port": 6053,
            "connected": true,
            "firmware_version": "2024.6.1",
            "sensors": [{
                "id": 11,
                "name": "climate",
                "type": "sensor",
                "class": "temperature",
                "unit": "°C",
                "accuracy_decimals": 1,
                "state": {"temperature": 21.5},
                "links": {"temperature": "Porch.temp"}
            }]
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    let dev = &devices[0];
    assert_eq!(dev.id, Some(1));
    assert!(dev.connected);
    assert_eq!(dev.sensors[0].device_class.as_deref(), Some("temperature"));
    assert_eq!(dev.sensors[0].accuracy_decimals, Some(1));
    assert_eq!(dev.sensors[0].links["temperature"], "Porch.temp");
}

#[tokio::test]
async fn test_list_devices_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    match result {
        Err(Error::Http { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_devices_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        api_key: Some(secrecy::SecretString::from("k-123".to_string())),
        ..TransportConfig::default()
    };
    let client = PanelClient::new(Url::parse(&server.uri()).unwrap(), &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/devices"))
        .and(header("X-API-KEY", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_devices().await.unwrap().is_empty());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_device_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/ESPHome/device"))
        .and(body_partial_json(json!({"name": "garage", "host": "10.0.0.5", "port": 6053})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    client.save_device(&draft("garage", "10.0.0.5")).await.unwrap();
}

#[tokio::test]
async fn test_save_device_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/ESPHome/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Host and name are required"
        })))
        .mount(&server)
        .await;

    let result = client.save_device(&draft("", "")).await;
    match result {
        Err(Error::Rejected { message }) => assert_eq!(message, "Host and name are required"),
        other => panic!("expected Rejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_device() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/ESPHome/device"))
        .and(query_param("id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_device(42).await.unwrap();
}

#[tokio::test]
async fn test_delete_device_empty_reply() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/ESPHome/device"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_device(3).await.unwrap();
}

#[tokio::test]
async fn test_delete_device_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/ESPHome/device"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Device not found"})))
        .mount(&server)
        .await;

    let err = client.delete_device(7).await.unwrap_err();
    assert!(err.is_not_found(), "got: {err:?}");
}

#[tokio::test]
async fn test_reconnect_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ESPHome/reconnect/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    client.reconnect_device(5).await.unwrap();
}

// ── Object catalog ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_objects_map_form() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/object/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Porch": "Front porch",
            "Garage": "Garage"
        })))
        .mount(&server)
        .await;

    let objects = client.list_objects().await.unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].id, "Porch");
    assert_eq!(objects[0].description, "Front porch");
}

#[tokio::test]
async fn test_list_objects_array_form() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/object/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Porch", "description": "Front porch", "properties": ["temp", "hum"]}
        ])))
        .mount(&server)
        .await;

    let objects = client.list_objects().await.unwrap();
    assert_eq!(objects[0].properties, vec!["temp", "hum"]);
}
