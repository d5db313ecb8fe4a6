use std::fs;

use hanclouds_sdk::{HanCloudsClient, HanCloudsError, HttpRequest, JsonResponse};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "HANCLOUDS_GATEWAY_URL")]
    gateway_url: Option<String>,
    #[serde(rename = "HANCLOUDS_DEVICE_KEY")]
    device_key: Option<String>,
    #[serde(rename = "HANCLOUDS_DEVICE_TOKEN")]
    device_token: Option<String>,
}

struct LiveDevice {
    gateway_url: String,
    device_key: String,
    device_token: String,
}

fn load_live_device() -> Result<LiveDevice, String> {
    if let (Ok(gateway_url), Ok(device_key), Ok(device_token)) = (
        std::env::var("HANCLOUDS_GATEWAY_URL"),
        std::env::var("HANCLOUDS_DEVICE_KEY"),
        std::env::var("HANCLOUDS_DEVICE_TOKEN"),
    ) {
        return Ok(LiveDevice {
            gateway_url,
            device_key,
            device_token,
        });
    }

    let content = fs::read_to_string("secrets.json").map_err(|_| {
        "HANCLOUDS_GATEWAY_URL/HANCLOUDS_DEVICE_KEY/HANCLOUDS_DEVICE_TOKEN env or secrets.json is required"
            .to_owned()
    })?;
    let parsed: SecretsFile = serde_json::from_str(&content)
        .map_err(|err| format!("secrets.json could not be parsed: {err}"))?;

    Ok(LiveDevice {
        gateway_url: parsed
            .gateway_url
            .ok_or_else(|| "missing HANCLOUDS_GATEWAY_URL in secrets.json".to_owned())?,
        device_key: parsed
            .device_key
            .ok_or_else(|| "missing HANCLOUDS_DEVICE_KEY in secrets.json".to_owned())?,
        device_token: parsed
            .device_token
            .ok_or_else(|| "missing HANCLOUDS_DEVICE_TOKEN in secrets.json".to_owned())?,
    })
}

#[tokio::test]
async fn live_device_command_listing() {
    let device = match load_live_device() {
        Ok(device) => device,
        Err(_) => {
            eprintln!("skipping live test: credentials not found in env or secrets.json");
            return;
        }
    };

    let mut client = HanCloudsClient::new(device.gateway_url);
    client.set_device_auth(&device.device_key, &device.device_token);
    client.set_retry_count(1);
    client.set_retry_interval(1_000);

    let path = format!("/devices/{}/commands", device.device_key);
    let result = client
        .execute(
            HttpRequest::<JsonResponse<JsonValue>>::get(path)
                .query("pageNo", 1)
                .query("pageSize", 10),
        )
        .await;

    match result {
        Ok(resp) => assert!(
            resp.raw().is_success(),
            "gateway rejected live request: {} {}",
            resp.status(),
            resp.raw().text()
        ),
        Err(HanCloudsError::Server(message)) => panic!("gateway unreachable: {message}"),
        Err(err) => panic!("live request failed: {err}"),
    }
}
