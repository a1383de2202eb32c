use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot.
///
/// Environment variables are read once at first access through `Lazy`
/// statics; tunables without an env override live in nested const modules.

/// Resolver API endpoint.
/// Read from RESOLVER_URL, defaults to the public cobalt instance.
pub static RESOLVER_URL: Lazy<String> = Lazy::new(|| {
    env::var("RESOLVER_URL").unwrap_or_else(|_| "https://api.cobalt.tools/api/json".to_string())
});

/// Whether a `redirect` resolver status is treated like a success.
///
/// The cobalt API sometimes answers `status: "redirect"` with the final
/// download link in `url`. Observed behavior is that following it works, but
/// the API does not guarantee it, so the policy stays configurable.
/// Read from RESOLVER_FOLLOW_REDIRECT, defaults to true.
pub static RESOLVER_FOLLOW_REDIRECT: Lazy<bool> = Lazy::new(|| {
    env::var("RESOLVER_FOLLOW_REDIRECT")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true)
});

/// Log file path.
/// Read from LOG_FILE_PATH, defaults to vidrelay.log in the working directory.
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "vidrelay.log".to_string()));

/// Supported domains with display labels.
///
/// Read from SUPPORTED_DOMAINS as a comma-separated `host=Label` list,
/// e.g. `youtube.com=YouTube,tiktok.com=TikTok`. Defaults to the platforms
/// the public cobalt instance handles reliably.
pub static SUPPORTED_DOMAINS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let raw = env::var("SUPPORTED_DOMAINS")
        .unwrap_or_else(|_| "youtube.com=YouTube,youtu.be=YouTube,tiktok.com=TikTok".to_string());
    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            match pair.split_once('=') {
                Some((host, label)) => Some((host.trim().to_lowercase(), label.trim().to_string())),
                None => Some((pair.to_lowercase(), pair.to_string())),
            }
        })
        .collect()
});

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for resolver API requests (in seconds)
    pub const RESOLVER_TIMEOUT_SECS: u64 = 30;

    /// Timeout for fetching the resolved file (in seconds).
    /// Generous because CDN downloads of long videos are slow.
    pub const FETCH_TIMEOUT_SECS: u64 = 300;

    /// Timeout for Telegram API requests, uploads included (in seconds)
    pub const TELEGRAM_TIMEOUT_SECS: u64 = 300;

    pub fn resolver_timeout() -> Duration {
        Duration::from_secs(RESOLVER_TIMEOUT_SECS)
    }

    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(FETCH_TIMEOUT_SECS)
    }

    pub fn telegram_timeout() -> Duration {
        Duration::from_secs(TELEGRAM_TIMEOUT_SECS)
    }
}

/// Resolver retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum attempts per resolver call (first try included)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Initial delay before the first retry
    pub const INITIAL_DELAY_MS: u64 = 500;

    /// Base for exponential backoff calculation
    pub const BACKOFF_BASE: u32 = 2;

    /// Cap on the computed backoff delay
    pub const MAX_DELAY_SECS: u64 = 10;

    /// Delay between dispatcher restart attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Maximum number of dispatcher restarts after panics
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Backoff delay for a given retry attempt (1-based), with up to 25% jitter.
    pub fn backoff_delay(attempt: u32) -> Duration {
        let base = INITIAL_DELAY_MS as f64 * f64::from(BACKOFF_BASE.pow(attempt.saturating_sub(1)));
        let capped = base.min(MAX_DELAY_SECS as f64 * 1000.0);
        let jitter = rand::random::<f64>() * 0.25 * capped;
        Duration::from_millis((capped + jitter) as u64)
    }
}

/// Validation configuration
pub mod validation {
    /// Maximum URL length (RFC 7230 recommends 8000, but 2048 is plenty)
    pub const MAX_URL_LENGTH: usize = 2048;

    /// Maximum file size for video uploads.
    /// The standard Telegram Bot API rejects files above 50 MB.
    pub const MAX_VIDEO_SIZE_BYTES: u64 = 50 * 1024 * 1024;
}

/// Link registry configuration
pub mod registry {
    use super::Duration;

    /// How long a stored link stays usable after the confirmation prompt
    pub const ENTRY_TTL_SECS: u64 = 60 * 60;

    /// Hard cap on registry entries; oldest are evicted beyond this
    pub const MAX_ENTRIES: usize = 1024;

    pub fn entry_ttl() -> Duration {
        Duration::from_secs(ENTRY_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let d1 = retry::backoff_delay(1);
        assert!(d1 >= Duration::from_millis(500));
        // 25% jitter at most
        assert!(d1 <= Duration::from_millis(625));

        let d_large = retry::backoff_delay(20);
        assert!(d_large <= Duration::from_millis(12_500));
    }

    #[test]
    fn test_default_supported_domains_parse() {
        // Defaults apply when the env var is unset; in CI it never is.
        let domains = &*SUPPORTED_DOMAINS;
        assert!(domains.iter().any(|(host, _)| host == "youtube.com"));
        assert!(domains.iter().any(|(host, label)| host == "tiktok.com" && label == "TikTok"));
    }
}
