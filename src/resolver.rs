//! Client for the cobalt-style resolver API.
//!
//! One JSON POST per resolution: `{url, vCodec, vQuality, aFormat,
//! disableMetadata}` in, `{status, url?, text?}` out. Transport failures and
//! 5xx responses are retried a bounded number of times with exponential
//! backoff; everything else is final. All outcomes fold into
//! [`ExtractionResult`] so the dialogue layer never has to unwrap.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

use crate::core::config;

/// Outcome of one resolver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// Resolver produced a direct download link
    Success(String),
    /// Resolver asks the caller to follow another link; whether that is
    /// treated like a success is a policy decision made by the caller
    Redirect(String),
    /// Resolution failed; the message is safe to show to the user
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct ResolverResponse {
    status: Option<String>,
    url: Option<String>,
    text: Option<String>,
}

/// Decodes one resolver HTTP response into an [`ExtractionResult`].
///
/// Pure so the wire-format handling is testable without a live endpoint.
pub fn parse_response(status: StatusCode, body: &str) -> ExtractionResult {
    if status != StatusCode::OK {
        return ExtractionResult::Failure(format!("resolver returned status {}", status.as_u16()));
    }

    let parsed: ResolverResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => return ExtractionResult::Failure("resolver returned an invalid response body".to_string()),
    };

    match (parsed.status.as_deref(), parsed.url) {
        (Some("success"), Some(url)) => ExtractionResult::Success(url),
        (Some("redirect"), Some(url)) => ExtractionResult::Redirect(url),
        _ => {
            let message = parsed
                .text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "unknown resolver error".to_string());
            ExtractionResult::Failure(message)
        }
    }
}

/// HTTP client for the resolver endpoint.
#[derive(Debug, Clone)]
pub struct ResolverClient {
    client: Client,
    endpoint: String,
}

impl ResolverClient {
    /// Builds a client against the configured endpoint (`RESOLVER_URL`).
    pub fn from_env() -> Result<Self, reqwest::Error> {
        Self::new(config::RESOLVER_URL.clone())
    }

    /// Builds a client against an explicit endpoint. Used by tests.
    ///
    /// Fails if the underlying HTTP client cannot be built; the request
    /// timeout is a required resource bound, not a nice-to-have.
    pub fn new(endpoint: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config::network::resolver_timeout()).build()?;
        Ok(Self { client, endpoint })
    }

    /// Resolves a (already domain-validated) video URL into a download link.
    ///
    /// Retries transport errors and 5xx responses up to
    /// `config::retry::MAX_ATTEMPTS` times with backoff and jitter. 4xx
    /// statuses and malformed bodies are final: retrying rejected input
    /// never helps.
    pub async fn resolve(&self, url: &str) -> ExtractionResult {
        let payload = json!({
            "url": url,
            "vCodec": "h264",
            "vQuality": "720",
            "aFormat": "mp3",
            "disableMetadata": true,
        });

        let max_attempts = config::retry::MAX_ATTEMPTS;
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            let response = self
                .client
                .post(&self.endpoint)
                .header("Accept", "application/json")
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_server_error() && attempt < max_attempts {
                        log::warn!(
                            "Resolver returned {} for {} (attempt {}/{}), retrying",
                            status.as_u16(),
                            url,
                            attempt,
                            max_attempts
                        );
                        last_failure = format!("resolver returned status {}", status.as_u16());
                        sleep(config::retry::backoff_delay(attempt)).await;
                        continue;
                    }

                    let body = match resp.text().await {
                        Ok(b) => b,
                        Err(e) => {
                            log::warn!("Failed to read resolver body for {}: {}", url, e);
                            return ExtractionResult::Failure("resolver returned an invalid response body".to_string());
                        }
                    };
                    return parse_response(status, &body);
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect();
                    if transient && attempt < max_attempts {
                        log::warn!(
                            "Resolver call failed for {} (attempt {}/{}): {}. Retrying",
                            url,
                            attempt,
                            max_attempts,
                            e
                        );
                        last_failure = format!("resolver unreachable: {}", e);
                        sleep(config::retry::backoff_delay(attempt)).await;
                        continue;
                    }
                    log::error!("Resolver call failed for {}: {}", url, e);
                    return ExtractionResult::Failure(format!("resolver unreachable: {}", e));
                }
            }
        }

        ExtractionResult::Failure(last_failure)
    }
}
