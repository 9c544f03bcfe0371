//! Shared HTTP plumbing for the source clients.

use super::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Build the client every source shares.
pub fn build_client(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("reportcards/", env!("CARGO_PKG_VERSION"))),
    );

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
}

/// GET `url` and decode the JSON body.
pub async fn get_json<T>(client: &Client, url: &str) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    debug!(url = url, "GET");
    let response = client.get(url).send().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    decode(url, response).await
}

async fn decode<T>(url: &str, response: reqwest::Response) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let text = response.text().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
