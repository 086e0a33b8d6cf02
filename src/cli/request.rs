//! CLI handler for one-off requests.

use reqwest::Method;

use crate::client::Client;
use crate::error::{BelayError, Result};

use super::RequestArgs;

/// Handle `belay request <METHOD> <PATH>`: prints the response body.
pub async fn handle_request(client: &Client, args: &RequestArgs) -> Result<()> {
    let method = parse_method(&args.method)?;
    let mut builder = client.request(method, &args.path);
    if let Some(data) = &args.data {
        let body: serde_json::Value = serde_json::from_str(data)?;
        builder = builder.json(&body);
    }

    let response = client.send(builder).await?;
    let status = response.status();
    let body = response.text().await?;
    tracing::debug!(status = status.as_u16(), "Response received");

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| BelayError::Configuration(format!("invalid HTTP method {raw:?}")))
}
