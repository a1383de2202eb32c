use thiserror::Error;

use crate::core::validation::ValidationError;
use crate::download::DownloadError;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent
/// error handling. Uses `thiserror` for automatic conversion and display
/// formatting. Handler endpoints catch these at the dispatch boundary and
/// turn them into user-facing replies; nothing propagates into the
/// dispatcher loop.
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Resolver call failed or returned an error payload
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Download relay errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Input validation errors (user-correctable)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
