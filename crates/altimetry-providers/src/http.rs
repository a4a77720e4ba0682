//! Shared HTTP plumbing for provider adapters: one `reqwest::Client` per
//! adapter, and the status-code classification every provider relies on to
//! satisfy the Retry Envelope's error taxonomy (spec §7).

use std::time::Duration;

use altimetry_core::error::ProviderError;

/// Builds a client with the configured per-provider HTTP timeout
/// (`HTTP_CLIENT_TIMEOUT_SECONDS`, default 20s — see `altimetry-server`'s
/// config layer).
pub fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("altimetry-providers/0.1")
        .build()
        .expect("reqwest client config is static and always valid")
}

/// Classifies a `reqwest` transport-level error per §7.
pub fn classify_transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_connect() {
        ProviderError::ServerError(err.to_string())
    } else {
        ProviderError::Unknown(err.to_string())
    }
}

/// Classifies an HTTP response status per §7: 429 is `RateLimit`, other 5xx
/// is `ServerError`, other 4xx is `ClientError`, anything else unexpected is
/// `Unknown`.
pub fn classify_status(status: reqwest::StatusCode) -> ProviderError {
    if status.as_u16() == 429 {
        ProviderError::RateLimit
    } else if status.is_server_error() {
        ProviderError::ServerError(status.to_string())
    } else if status.is_client_error() {
        ProviderError::ClientError(status.to_string())
    } else {
        ProviderError::Unknown(format!("unexpected status {status}"))
    }
}

/// GETs `url` and parses the body as JSON, applying the classification
/// above. A 404 is surfaced as `Ok(None)` since most providers treat "not
/// found" as an empty, successful result rather than an error.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<serde_json::Value>, ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_transport_error(&e))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(classify_status(response.status()));
    }

    let value = response
        .json::<serde_json::Value>()
        .await
        .map_err(|_| ProviderError::ContentMalformed("response body is not valid JSON".into()))?;
    Ok(Some(value))
}

/// GETs `url` and returns the raw text body, same 404/error handling as
/// [`get_json`]. Used by providers that scrape HTML or XML.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<String>, ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_transport_error(&e))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(classify_status(response.status()));
    }

    response
        .text()
        .await
        .map_err(|e| classify_transport_error(&e))
        .map(Some)
}
