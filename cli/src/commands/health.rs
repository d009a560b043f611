use berth_core::api::{Empty, PingResponse};
use berth_core::{ApiClient, Route};

pub async fn ping(client: &ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let response: PingResponse = client
        .call(Route::Ping, &Empty {})
        .await
        .map_err(|e| format!("ping: {e}"))?;
    println!("ok (daemon {})", response.version);
    Ok(())
}
