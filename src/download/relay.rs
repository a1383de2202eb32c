//! Streaming fetch of a resolved link and re-upload into the chat.
//!
//! The file is streamed chunk by chunk into a named scratch file instead of
//! being buffered in memory; resolved videos routinely run into hundreds of
//! megabytes. The scratch file is owned by a `NamedTempFile`, so it is
//! removed on every exit path, including mid-stream failures.

use std::io::Write;

use futures_util::StreamExt;
use reqwest::Client;
use tempfile::NamedTempFile;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile};

use crate::core::config;
use crate::download::error::DownloadError;

/// HTTP client for fetching resolved links.
///
/// The fetch and connect timeouts are part of the resource bounds on a
/// single download, so a builder failure is fatal rather than papered
/// over with a default client.
pub fn build_fetch_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent("Mozilla/5.0 (compatible; vidrelay/0.3)")
        .timeout(config::network::fetch_timeout())
        .connect_timeout(std::time::Duration::from_secs(30))
        .build()
}

/// Streams `url` into a scratch file, enforcing the upload size limit.
///
/// The limit is checked twice: against `Content-Length` before any byte is
/// read, and against the running total while streaming, since servers lie
/// about or omit the header.
pub async fn fetch_to_tempfile(http: &Client, url: &str) -> Result<(NamedTempFile, u64), DownloadError> {
    let limit = config::validation::MAX_VIDEO_SIZE_BYTES;

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::FetchFailed(format!("request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(DownloadError::FetchFailed(format!("HTTP {} for {}", response.status(), url)));
    }

    if let Some(len) = response.content_length() {
        if len > limit {
            return Err(DownloadError::TooLarge { size: len, limit });
        }
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("vidrelay-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| DownloadError::FetchFailed(format!("failed to create scratch file: {}", e)))?;

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::FetchFailed(format!("error reading chunk: {}", e)))?;

        tmp.as_file_mut()
            .write_all(&chunk)
            .map_err(|e| DownloadError::FetchFailed(format!("error writing scratch file: {}", e)))?;

        downloaded += chunk.len() as u64;
        if downloaded > limit {
            return Err(DownloadError::TooLarge { size: downloaded, limit });
        }
    }

    tmp.as_file_mut()
        .flush()
        .map_err(|e| DownloadError::FetchFailed(format!("failed to flush scratch file: {}", e)))?;

    Ok((tmp, downloaded))
}

/// True when Telegram rejected an upload for exceeding the size limit.
///
/// The Bot API answers 413 "Request Entity Too Large"; teloxide surfaces it
/// through the error text, so classification is string-based.
pub fn is_too_large_error(err: &teloxide::RequestError) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("request entity too large") || text.contains("too large") || text.contains("413")
}

/// Fetches a resolved link and re-uploads it into the chat as a video.
///
/// The scratch file lives exactly as long as this function: `NamedTempFile`
/// deletes it on drop whether the upload succeeded, failed, or the fetch
/// never completed.
pub async fn fetch_and_relay(http: &Client, bot: &Bot, chat_id: ChatId, url: &str) -> Result<(), DownloadError> {
    log::info!("Relaying {} to chat {}", url, chat_id);

    let (tmp, size) = fetch_to_tempfile(http, url).await?;
    log::info!("Fetched {:.2} MB to {}", size as f64 / (1024.0 * 1024.0), tmp.path().display());

    // Best effort; an unsent chat action never blocks the upload.
    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::UploadVideo).await {
        log::warn!("Failed to send chat action to {}: {}", chat_id, e);
    }

    let upload = bot.send_video(chat_id, InputFile::file(tmp.path().to_path_buf())).await;

    match upload {
        Ok(_) => {
            log::info!("Upload to chat {} complete ({} bytes)", chat_id, size);
            Ok(())
        }
        Err(e) if is_too_large_error(&e) => Err(DownloadError::TooLarge {
            size,
            limit: config::validation::MAX_VIDEO_SIZE_BYTES,
        }),
        Err(e) => Err(DownloadError::UploadFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::ApiError;

    fn scratch_file_count() -> usize {
        std::fs::read_dir(std::env::temp_dir())
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with("vidrelay-"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_fetch_failure_on_unreachable_host() {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();

        let before = scratch_file_count();
        let result = fetch_to_tempfile(&http, "http://127.0.0.1:1/video.mp4").await;

        assert!(matches!(result, Err(DownloadError::FetchFailed(_))));
        // No scratch file left behind by the failed fetch
        assert_eq!(scratch_file_count(), before);
    }

    #[test]
    fn test_fetch_client_builds() {
        assert!(build_fetch_client().is_ok());
    }

    #[test]
    fn test_too_large_classification() {
        let err = teloxide::RequestError::Api(ApiError::Unknown("Request Entity Too Large".to_string()));
        assert!(is_too_large_error(&err));

        let other = teloxide::RequestError::Api(ApiError::Unknown("Bad Request: chat not found".to_string()));
        assert!(!is_too_large_error(&other));
    }
}
