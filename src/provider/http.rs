//! Shared HTTP plumbing for hosted providers
//!
//! Client construction and the retry loop used by every vendor adapter.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EndpointSettings;
use crate::error::{Error, Result};

/// Build an HTTP client honouring the endpoint timeout
pub(crate) fn build_client(provider: &'static str, endpoint: &EndpointSettings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(endpoint.timeout_secs))
        .build()
        .map_err(|e| Error::provider(provider, format!("Failed to create HTTP client: {}", e)))
}

/// Join a base URL and a path without doubling the slash
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// First retry delay
const BASE_BACKOFF_MS: u64 = 500;

/// Ceiling for a single retry delay
const MAX_BACKOFF_MS: u64 = 30_000;

/// Delay before retry `attempt` (1-based): 500ms, 1s, 2s, ... capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Send a request, retrying rate limits, server errors and connection failures.
///
/// `build` is called once per attempt since a RequestBuilder is consumed by
/// `send`.
pub(crate) async fn send_with_retry<F>(
    provider: &'static str,
    max_retries: u32,
    build: F,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(attempt);
            debug!(provider, attempt, ?backoff, "Retrying after error");
            tokio::time::sleep(backoff).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response);
                }

                let body = response.text().await.unwrap_or_default();
                let err = Error::provider(provider, describe_status(status, &body));

                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    // Retryable error
                    warn!(provider, status = %status, attempt, "Retryable API error");
                    last_error = Some(err);
                } else {
                    return Err(err);
                }
            }
            Err(e) => {
                // The URL can carry a key for some vendors
                let e = e.without_url();
                if e.is_timeout() || e.is_connect() {
                    warn!(provider, attempt, error = %e, "Retryable connection error");
                    last_error = Some(Error::provider(provider, format!("Connection error: {}", e)));
                } else {
                    return Err(Error::provider(provider, format!("Request error: {}", e)));
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::provider(provider, "All retry attempts exhausted")))
}

/// Human readable description of a failed HTTP status
fn describe_status(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication rejected ({}): {}", status, body)
        }
        _ => format!("status {}: {}", status, body),
    }
}

/// Decode a JSON response body into `T`
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::provider(provider, format!("Failed to parse response: {}", e.without_url())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(2));
        assert_eq!(backoff_delay(20), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(65), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://api.openai.com/v1", "chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(join_url("http://localhost:8080/v1/", "/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_unauthorized_reads_as_auth_problem() {
        let err = Error::provider("openai", describe_status(StatusCode::UNAUTHORIZED, "{}"));
        assert!(err.is_authentication_problem());
    }

    #[test]
    fn test_server_error_description() {
        let msg = describe_status(StatusCode::BAD_GATEWAY, " upstream down ");
        assert_eq!(msg, "status 502 Bad Gateway: upstream down");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client("openai", &EndpointSettings::openai()).is_ok());
    }
}
