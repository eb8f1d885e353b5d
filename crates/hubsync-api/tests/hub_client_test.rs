#![allow(clippy::unwrap_used)]
// Integration tests for `HubClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hubsync_api::{Error, HubClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HubClient) {
    let server = MockServer::start().await;
    let app_url = Url::parse(&format!("{}/api/installations/", server.uri())).unwrap();
    let client = HubClient::with_client(
        reqwest::Client::new(),
        app_url,
        "app-123",
        SecretString::from("token-abc".to_string()),
    );
    (server, client)
}

fn app_path(suffix: &str) -> String {
    format!("/api/installations/app-123/{suffix}")
}

// ── Inventory ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(app_path("devices")))
        .and(query_param("access_token", "token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceList": [{
                "deviceid": "d1",
                "name": "Lamp",
                "capabilities": { "Switch": 1 },
                "attributes": { "switch": "off" }
            }],
            "location": {
                "temperature_scale": "C",
                "hubIP": "192.168.1.20",
                "local_commands": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let inventory = client.get_devices().await.unwrap();

    let devices = inventory.device_list.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_id, "d1");
    assert_eq!(devices[0].attributes["switch"], json!("off"));
    let location = inventory.location.unwrap();
    assert_eq!(location.temperature_scale.as_deref(), Some("C"));
    assert_eq!(location.hub_ip.as_deref(), Some("192.168.1.20"));
    assert!(location.local_commands());
}

#[tokio::test]
async fn test_get_devices_http_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(app_path("devices")))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let result = client.get_devices().await;
    assert!(
        matches!(result, Err(Error::Http { status: 401, .. })),
        "expected Http 401, got: {result:?}"
    );
    assert!(result.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_get_devices_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(app_path("devices")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client.get_devices().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("maintenance")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Direct connect ──────────────────────────────────────────────────

#[tokio::test]
async fn test_send_start_direct() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(app_path("startDirect/10.0.0.9/8000/0.1.0")))
        .and(query_param("access_token", "token-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send_start_direct("10.0.0.9", 8000, "0.1.0")
        .await
        .unwrap();
}

// ── Command routing ─────────────────────────────────────────────────

#[tokio::test]
async fn test_command_goes_to_cloud_by_default() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(app_path("d1/command/on")))
        .and(query_param("access_token", "token-abc"))
        .and(body_partial_json(json!({ "values": [] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.send_device_command("d1", "on", &[]).await.unwrap();
}

#[tokio::test]
async fn test_command_goes_to_local_hub_when_preferred() {
    let (server, client) = setup().await;
    let port = Url::parse(&server.uri()).unwrap().port().unwrap();
    let client = client.with_local_hub_port(port);
    client.update_globals(Some("127.0.0.1"), true);

    Mock::given(method("POST"))
        .and(path("/event"))
        .and(header("evtType", "hkCommand"))
        .and(body_partial_json(json!({
            "deviceid": "d1",
            "command": "setLevel",
            "values": [40]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send_device_command("d1", "setLevel", &[json!(40)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_local_routing_without_hub_ip_fails() {
    let (_server, client) = setup().await;
    client.update_globals(None, true);

    let result = client.send_device_command("d1", "on", &[]).await;
    assert!(matches!(result, Err(Error::LocalHubUnavailable)));
}
