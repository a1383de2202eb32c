//! Dispatcher schema and the confirmation-flow handlers.
//!
//! One inbound text message drives: allow-list validation → resolver call →
//! link registry store → confirmation prompt with inline buttons. The
//! button press then drives: registry lookup → streaming relay → state
//! cleanup. Every failure is converted into a user-visible reply at this
//! boundary; no error leaves an endpoint, so one chat's failure can never
//! stall the dispatch loop for everyone else.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::{SupportedDomains, ValidationError};
use crate::download;
use crate::registry::LinkRegistry;
use crate::resolver::{ExtractionResult, ResolverClient};
use crate::state::ConversationStore;
use crate::telegram::bot::Command;
use crate::telegram::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

const WELCOME_TEXT: &str = "Hi! Send me a video URL, and I will extract the download link for you.";

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub resolver: Arc<ResolverClient>,
    pub registry: Arc<LinkRegistry>,
    pub states: Arc<ConversationStore>,
    pub domains: Arc<SupportedDomains>,
    /// Shared client for fetching resolved links
    pub fetch_client: reqwest::Client,
}

impl HandlerDeps {
    pub fn new(
        resolver: Arc<ResolverClient>,
        registry: Arc<LinkRegistry>,
        states: Arc<ConversationStore>,
        domains: Arc<SupportedDomains>,
        fetch_client: reqwest::Client,
    ) -> Self {
        Self {
            resolver,
            registry,
            states,
            domains,
            fetch_client,
        }
    }

    /// Builds the full dependency set from environment configuration.
    ///
    /// Fails if either HTTP client cannot be built.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(ResolverClient::from_env()?),
            Arc::new(LinkRegistry::from_config()),
            Arc::new(ConversationStore::new()),
            Arc::new(SupportedDomains::from_config()),
            download::build_fetch_client()?,
        ))
    }
}

/// Action encoded in a confirmation prompt's callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Confirm button: download the link behind this registry id
    Download(String),
    /// Cancel button
    Cancel,
    /// Anything else (stale buttons from older bot versions, garbage)
    Unknown,
}

/// Parses callback data (`confirm:<id>` or `cancel`) into an action.
pub fn parse_callback(data: &str) -> CallbackAction {
    if let Some(id) = data.strip_prefix("confirm:") {
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit()) {
            return CallbackAction::Download(id.to_string());
        }
        return CallbackAction::Unknown;
    }
    if data == "cancel" {
        return CallbackAction::Cancel;
    }
    CallbackAction::Unknown
}

/// Inline keyboard for the confirmation prompt.
pub fn confirm_keyboard(link_id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("⬇️ Download", format!("confirm:{}", link_id)),
        InlineKeyboardButton::callback("✖️ Cancel", "cancel"),
    ]])
}

/// Creates the main dispatcher schema for the bot.
///
/// Returns a handler tree usable with teloxide's Dispatcher. The same
/// schema serves production and integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler())
        // Message handler for URLs
        .branch(message_handler(deps_messages))
        // Callback query handler for the confirm/cancel buttons
        .branch(callback_handler(deps_callback))
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(|bot: Bot, msg: Message, cmd: Command| async move {
            match cmd {
                Command::Start => {
                    if let Err(e) = bot.send_message(msg.chat.id, WELCOME_TEXT).await {
                        log::error!("Failed to send welcome to {}: {}", msg.chat.id, e);
                    }
                }
            }
            Ok(())
        })
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let chat_id = msg.chat.id;
                if let Err(e) = handle_url_message(&bot, &msg, &deps).await {
                    log::warn!("URL request from chat {} failed: {}", chat_id, e);
                    reply_or_log(&bot, chat_id, &request_failure_text(&e, &deps.domains)).await;
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            handle_callback(&bot, &q, &deps).await;
            Ok(())
        }
    })
}

/// Handles an inbound text message as a video URL request.
///
/// The returned error is already classified; the endpoint turns it into a
/// user-facing reply via [`request_failure_text`].
async fn handle_url_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return Ok(());
    }

    // A new URL supersedes any outstanding confirmation for this chat.
    if deps.states.get(chat_id).await.is_awaiting_confirmation() {
        deps.states.clear(chat_id).await;
    }

    let url = deps.domains.validate(&text)?;

    log::info!("Resolving {} for chat {}", url, chat_id);

    let link = match deps.resolver.resolve(url.as_str()).await {
        ExtractionResult::Success(link) => link,
        ExtractionResult::Redirect(link) if *config::RESOLVER_FOLLOW_REDIRECT => link,
        ExtractionResult::Redirect(_) => {
            return Err(AppError::Extraction("the resolver answered with a redirect".to_string()));
        }
        ExtractionResult::Failure(message) => return Err(AppError::Extraction(message)),
    };

    // Registry first, state second: a pending_link_id must always be backed
    // by a registry entry at the moment it is recorded.
    let link_id = deps.registry.store(&link).await;
    deps.states.set_awaiting(chat_id, link_id.clone()).await;

    let prompt = "Found a downloadable video. Send it here as a file?";
    if let Err(e) = bot
        .send_message(chat_id, prompt)
        .reply_markup(confirm_keyboard(&link_id))
        .await
    {
        // Without the prompt on screen the pending state is unreachable.
        deps.states.clear(chat_id).await;
        return Err(e.into());
    }

    Ok(())
}

/// Handles a button press under a confirmation prompt.
async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) {
    // Always acknowledge so the client stops its spinner.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Failed to answer callback query {:?}: {}", q.id, e);
    }

    let (chat_id, message_id) = match q.message.as_ref().map(|m| (m.chat().id, m.id())) {
        Some(pair) => pair,
        None => {
            log::warn!("Callback query {:?} without an accessible message, ignoring", q.id);
            return;
        }
    };

    let action = q.data.as_deref().map(parse_callback).unwrap_or(CallbackAction::Unknown);

    match action {
        CallbackAction::Download(link_id) => {
            if let Err(e) = handle_confirm(bot, chat_id, message_id, &link_id, deps).await {
                let text = match &e {
                    AppError::Download(d) => {
                        log::error!("Relay failed for chat {} ({}): {}", chat_id, d.category(), d);
                        d.user_message()
                    }
                    other => {
                        log::error!("Confirmed download failed for chat {}: {}", chat_id, other);
                        "Something went wrong. Please try again.".to_string()
                    }
                };
                edit_or_log(bot, chat_id, message_id, &text).await;
            }
            // Idle again no matter how the download went.
            deps.states.clear(chat_id).await;
        }
        CallbackAction::Cancel => {
            deps.states.clear(chat_id).await;
            edit_or_log(bot, chat_id, message_id, "Cancelled. Send me another URL whenever you like.").await;
        }
        CallbackAction::Unknown => {
            // Defensive cleanup for stale or malformed buttons.
            log::warn!("Unrecognized callback data {:?} from chat {}", q.data, chat_id);
            deps.states.clear(chat_id).await;
        }
    }
}

async fn handle_confirm(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    link_id: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let link = match deps.registry.lookup(link_id).await {
        Some(link) => link,
        None => {
            // Stale id: registry entry expired, was evicted, or the process
            // restarted since the prompt was sent.
            edit_or_log(bot, chat_id, message_id, "This link has expired. Please send the URL again.").await;
            return Ok(());
        }
    };

    edit_or_log(bot, chat_id, message_id, "⏳ Downloading, this can take a while...").await;

    download::fetch_and_relay(&deps.fetch_client, bot, chat_id, &link).await?;

    edit_or_log(bot, chat_id, message_id, "✅ Done!").await;
    Ok(())
}

/// User-facing reply for a failed URL request.
fn request_failure_text(err: &AppError, domains: &SupportedDomains) -> String {
    match err {
        AppError::Validation(e) => rejection_text(e, domains),
        AppError::Extraction(message) => format!("Failed to extract video: {}", message),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

/// Rejection reply for a URL that failed validation.
fn rejection_text(err: &ValidationError, domains: &SupportedDomains) -> String {
    match err {
        ValidationError::UnsupportedDomain(host) => format!(
            "{} is not a supported site. Please send a link from: {}.",
            host,
            domains.labels().join(", ")
        ),
        ValidationError::InvalidUrl(_) => format!(
            "That doesn't look like a valid video URL. Please send a link from: {}.",
            domains.labels().join(", ")
        ),
        ValidationError::TooLong(len) => format!("That URL is too long ({} characters).", len),
    }
}

async fn reply_or_log(bot: &Bot, chat_id: ChatId, text: &str) {
    if let Err(e) = bot.send_message(chat_id, text).await {
        log::error!("Failed to reply to {}: {}", chat_id, e);
    }
}

async fn edit_or_log(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: &str) {
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        log::warn!("Failed to edit message {} in {}: {}", message_id.0, chat_id, e);
    }
}
