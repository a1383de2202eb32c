//! Bot initialization and command definitions.

use reqwest::ClientBuilder;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "What I can do:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
}

/// Creates a Bot instance with an upload-sized request timeout.
///
/// The token comes from the TELOXIDE_TOKEN environment variable.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the underlying HTTP client
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::telegram_timeout()).build()?;
    Ok(Bot::from_env_with_client(client))
}

/// Sets up bot commands in the Telegram UI
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::prelude::*;
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![BotCommand::new("start", "show the welcome message")])
        .await?;

    Ok(())
}
