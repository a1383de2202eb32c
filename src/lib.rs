//! Vidrelay - Telegram bot that turns video links into chat uploads
//!
//! The bot accepts a video URL, forwards it to a cobalt-style resolver API,
//! asks the user to confirm via inline buttons, then streams the resolved
//! file to a scratch file and re-uploads it into the chat.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, URL validation
//! - `resolver`: HTTP client for the extraction API
//! - `registry`: short-id registry for resolved download links
//! - `state`: per-chat conversation state machine
//! - `download`: streaming fetch + Telegram upload relay
//! - `telegram`: bot bootstrap and the dptree handler schema

pub mod core;
pub mod download;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::error::{AppError, AppResult};
pub use download::{fetch_and_relay, DownloadError};
pub use registry::LinkRegistry;
pub use resolver::{ExtractionResult, ResolverClient};
pub use state::{ConversationState, ConversationStore};
pub use telegram::{create_bot, schema, HandlerDeps};
