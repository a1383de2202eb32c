//! Download relay: streaming fetch of a resolved link plus Telegram upload.

pub mod error;
pub mod relay;

pub use error::DownloadError;
pub use relay::{build_fetch_client, fetch_and_relay};
