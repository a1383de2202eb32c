use thiserror::Error;

/// Structured error type for the fetch-and-relay path.
///
/// `TooLarge` is split out from the generic upload failure because it is
/// the most common real-world outcome and the user needs to hear it as
/// such, not as an opaque error.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network failure while fetching the resolved link
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Payload exceeds the Telegram upload limit
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    /// Telegram rejected the upload for any other reason
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl DownloadError {
    /// Short category tag for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::FetchFailed(_) => "fetch_failed",
            DownloadError::TooLarge { .. } => "too_large",
            DownloadError::UploadFailed(_) => "upload_failed",
        }
    }

    /// User-facing reply text for this failure.
    pub fn user_message(&self) -> String {
        match self {
            DownloadError::FetchFailed(_) => "Failed to download the video. Please try again later.".to_string(),
            DownloadError::TooLarge { size, limit } => format!(
                "The video is too large to send ({:.1} MB, limit {:.0} MB).",
                *size as f64 / (1024.0 * 1024.0),
                *limit as f64 / (1024.0 * 1024.0)
            ),
            DownloadError::UploadFailed(_) => "Failed to send the video. Please try again later.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tags() {
        assert_eq!(DownloadError::FetchFailed(String::new()).category(), "fetch_failed");
        assert_eq!(DownloadError::TooLarge { size: 1, limit: 1 }.category(), "too_large");
        assert_eq!(DownloadError::UploadFailed(String::new()).category(), "upload_failed");
    }

    #[test]
    fn test_too_large_user_message_is_distinct() {
        let err = DownloadError::TooLarge {
            size: 120 * 1024 * 1024,
            limit: 50 * 1024 * 1024,
        };
        let msg = err.user_message();
        assert!(msg.contains("too large"), "message was: {}", msg);
        assert!(msg.contains("120.0 MB"), "message was: {}", msg);

        let generic = DownloadError::UploadFailed("boom".to_string()).user_message();
        assert_ne!(msg, generic);
    }

    #[test]
    fn test_display_includes_sizes() {
        let err = DownloadError::TooLarge { size: 100, limit: 50 };
        assert_eq!(err.to_string(), "file too large: 100 bytes (limit 50)");
    }
}
