//! URL validation against the configured domain allow-list.
//!
//! Whitelist-based: only HTTP/HTTPS schemes, only hosts that equal or are a
//! subdomain of a configured domain. Everything else is rejected before any
//! network call is made.

use thiserror::Error;
use url::Url;

use crate::core::config;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Not a parseable URL at all
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Parseable, but the host is not on the allow-list
    #[error("Unsupported domain: {0}")]
    UnsupportedDomain(String),

    /// URL exceeds the maximum accepted length
    #[error("URL too long ({0} characters)")]
    TooLong(usize),
}

/// The set of domains the bot accepts, with display labels for replies.
#[derive(Debug, Clone)]
pub struct SupportedDomains {
    domains: Vec<(String, String)>,
}

impl SupportedDomains {
    /// Builds the allow-list from `SUPPORTED_DOMAINS` (or its defaults).
    pub fn from_config() -> Self {
        Self {
            domains: config::SUPPORTED_DOMAINS.clone(),
        }
    }

    /// Builds an allow-list from explicit `(host, label)` pairs.
    pub fn new(domains: Vec<(String, String)>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|(host, label)| (host.to_lowercase(), label))
                .collect(),
        }
    }

    /// Validates that a URL is well-formed and on the allow-list.
    ///
    /// # Security
    /// Host matching is exact-or-subdomain, not substring: `youtube.com`
    /// accepts `www.youtube.com` but rejects `evilyoutube.com` and
    /// `youtube.com.evil.example`.
    pub fn validate(&self, url: &str) -> Result<Url, ValidationError> {
        if url.len() > config::validation::MAX_URL_LENGTH {
            return Err(ValidationError::TooLong(url.len()));
        }

        let parsed = Url::parse(url).map_err(|_| ValidationError::InvalidUrl(url.to_string()))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl(format!(
                "{} (invalid scheme: {})",
                url,
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ValidationError::InvalidUrl(format!("{} (no host)", url)))?
            .to_lowercase();

        let supported = self
            .domains
            .iter()
            .any(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)));

        if !supported {
            return Err(ValidationError::UnsupportedDomain(host));
        }

        Ok(parsed)
    }

    /// Distinct display labels, for the unsupported-domain reply.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for (_, label) in &self.domains {
            if !labels.contains(&label.as_str()) {
                labels.push(label);
            }
        }
        labels
    }
}
