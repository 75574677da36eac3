//! Onboarding handler: `/start` and `/help`.
//!
//! `/start` optionally carries a referral code (conventionally the
//! referrer's user id, delivered through the player's referral deep link).
//! The handler only renders the welcome prompt; persistence waits until the
//! player actually taps Play.

use log::{debug, info};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use url::Url;

use crate::bot::payload::CallbackPayload;
use crate::bot::{HandlerDeps, HandlerError};
use crate::logutil::sanitize_for_log;

/// Game guide shown on `/start` and `/help`.
pub const WELCOME_MESSAGE: &str = "\
# How to play Clover ⚡️

💰 Tap to earn
Tap the screen and collect coins.

📈 LVL
The more coins you have on your balance, the higher the level of your exchange is and the faster you can earn more coins.

👥 Friends
Invite your friends and you'll get bonuses. Help a friend move to the next leagues and you'll get even more bonuses.

🪙 Token listing
At the end of the season, a token will be released and distributed among the players. Dates will be announced in our announcement channel. Stay tuned!

To get this guide, type /help.";

/// Commands the bot reacts to. `/start` accepts an optional referral code
/// argument delivered by the deep link.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "start the game")]
    Start(String),
    #[command(description = "show the game guide")]
    Help,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    deps: HandlerDeps,
) -> Result<(), HandlerError> {
    match cmd {
        Command::Start(argument) => handle_start(bot, msg, &argument, deps).await,
        Command::Help => {
            bot.send_message(msg.chat.id, WELCOME_MESSAGE).await?;
            Ok(())
        }
    }
}

/// Send the welcome prompt: the guide text plus a Play button carrying the
/// referral code (empty when absent) and a static subscribe link.
async fn handle_start(
    bot: Bot,
    msg: Message,
    argument: &str,
    deps: HandlerDeps,
) -> Result<(), HandlerError> {
    let referral = match argument.trim() {
        "" => None,
        code => Some(code),
    };
    if let Some(code) = referral {
        debug!(
            "Start command in chat {} carries referral code '{}'",
            msg.chat.id,
            sanitize_for_log(code, 40)
        );
    }

    let play = CallbackPayload::play(referral);
    let subscribe_url = Url::parse(&deps.config.bot.channel_url)?;
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("Play 🎮", play.encode())],
        vec![InlineKeyboardButton::url(
            "Subscribe to Our Telegram",
            subscribe_url,
        )],
    ]);

    bot.send_message(msg.chat.id, WELCOME_MESSAGE)
        .reply_markup(keyboard)
        .await?;
    info!("Sent welcome prompt to chat {}", msg.chat.id);
    Ok(())
}
