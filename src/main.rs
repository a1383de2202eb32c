use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::{interval, sleep};

use vidrelay::core::{config, init_logger};
use vidrelay::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env before any config is read
    let _ = dotenv();

    // Set up a global panic handler so panics inside handler tasks get
    // logged instead of silently unwinding.
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    run_bot().await
}

/// Run the Telegram bot in long polling mode.
async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let bot = create_bot()?;

    let bot_info = bot
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Bot API: {}", e))?;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}. Continuing anyway.", e);
    }

    let deps = HandlerDeps::from_env()?;
    log::info!(
        "Resolver endpoint: {} (follow redirects: {})",
        *config::RESOLVER_URL,
        *config::RESOLVER_FOLLOW_REDIRECT
    );

    // Periodic sweep of expired link registry entries (every 10 minutes)
    {
        let registry = Arc::clone(&deps.registry);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(10 * 60));
            loop {
                interval.tick().await;
                registry.cleanup().await;
            }
        });
    }

    let handler = schema(deps);

    log::info!("Starting bot in long polling mode");

    // Run the dispatcher with retry logic: panics inside the dispatcher
    // task are caught via the JoinHandle and answered with a bounded
    // reconnect instead of taking the process down.
    let mut retry_count = 0;
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;

    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            // Drop updates that queued up while the bot was down; stale
            // URL requests are better re-sent than answered late.
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    log::error!("Dispatcher panicked: {}", join_err);

                    if retry_count < max_retries {
                        retry_count += 1;
                        log::info!(
                            "Retrying dispatcher connection after panic (attempt {}/{})...",
                            retry_count,
                            max_retries
                        );
                        sleep(config::retry::dispatcher_delay()).await;
                    } else {
                        log::error!("Max dispatcher retries reached. Exiting...");
                        break;
                    }
                } else {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
            }
        }
    }

    Ok(())
}
