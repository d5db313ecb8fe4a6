use hanclouds_sdk::{HanCloudsClient, HttpRequest, JsonResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut client = HanCloudsClient::from_env().map_err(anyhow::Error::msg)?;
    let device_key = std::env::var("HANCLOUDS_DEVICE_KEY")?;
    let device_token = std::env::var("HANCLOUDS_DEVICE_TOKEN")?;
    client.set_device_auth(&device_key, &device_token);

    let resp = client
        .execute(
            HttpRequest::<JsonResponse<serde_json::Value>>::get(format!(
                "/devices/{device_key}/commands"
            ))
            .query("pageNo", 1)
            .query("pageSize", 20),
        )
        .await?;

    println!("status: {}", resp.status());
    if let Some(data) = resp.data() {
        println!("{data:#}");
    }

    Ok(())
}
