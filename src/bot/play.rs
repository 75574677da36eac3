//! Play handler: the second half of the onboarding handshake.
//!
//! Tapping the Play button decodes the callback payload, registers the
//! player if they are new, attributes a referral when one rode along, and
//! replaces the two-button prompt with a single link into the game client.
//!
//! Registration itself ([`register_player`]) is free of Telegram types so
//! integration tests can exercise the create/attribute logic directly
//! against a throwaway store.

use log::{debug, error, info};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, User};
use thiserror::Error;
use url::Url;

use crate::bot::payload::CallbackPayload;
use crate::bot::{referral, HandlerDeps, HandlerError};
use crate::config::{BotConfig, GameConfig};
use crate::logutil::sanitize_for_log;
use crate::metrics;
use crate::storage::{ReferralOutcome, StoreError, UserRecord, UserStore};
use crate::validation::{validate_user_id, ValidationError};

/// Display metadata defaults to this sentinel when Telegram omits a field.
const FIELD_MISSING: &str = "N/A";

/// Generic failure message; details stay server-side in the log.
const STORE_ERROR_MESSAGE: &str =
    "An error occurred while storing your data. Please try again.";

/// The identity fields a registration needs, decoupled from Telegram types.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub id: u64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl From<&User> for PlayerProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// What a Play invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A fresh record was written; `referral` reports attribution when a
    /// code was supplied.
    Created { referral: Option<ReferralOutcome> },
    /// The record already existed; nothing changed (idempotent replay).
    AlreadyRegistered,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Register a player on first contact.
///
/// Creation is guarded by the store's compare-and-swap, so a replayed Play
/// never overwrites state and never re-attributes a referral.
pub fn register_player(
    store: &UserStore,
    bot_cfg: &BotConfig,
    game_cfg: &GameConfig,
    profile: &PlayerProfile,
    referral_code: Option<&str>,
) -> Result<RegistrationOutcome, RegistrationError> {
    // The id is normally always present; validated defensively anyway.
    let user_id = validate_user_id(&profile.id.to_string())?;

    let candidate = UserRecord {
        id: profile.id as i64,
        username: profile.username.clone().unwrap_or_else(|| FIELD_MISSING.to_string()),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone().unwrap_or_else(|| FIELD_MISSING.to_string()),
        level: game_cfg.starting_level,
        tap_per_click: game_cfg.tap_per_click,
        balance: 0,
        energy: game_cfg.starting_energy,
        invited: Vec::new(),
        referral_link: format!("{}?start={}", bot_cfg.referral_base_url, profile.id),
        referrer_id: None,
    };

    if !store.create_user_if_absent(&candidate)? {
        return Ok(RegistrationOutcome::AlreadyRegistered);
    }
    metrics::inc_users_created();

    let referral_outcome = match referral_code {
        Some(code) => Some(referral::attribute(
            store,
            code,
            &user_id,
            game_cfg.referral_bonus,
        )?),
        None => None,
    };
    Ok(RegistrationOutcome::Created {
        referral: referral_outcome,
    })
}

/// Handle an inline-button callback. Non-play payloads are ignored.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    deps: HandlerDeps,
) -> Result<(), HandlerError> {
    let Some(raw) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(CallbackPayload::Play { referral }) = CallbackPayload::parse(raw) else {
        debug!(
            "Ignoring unrecognized callback payload '{}'",
            sanitize_for_log(raw, 60)
        );
        return Ok(());
    };

    // Stop the client-side spinner; a failure here is not worth aborting for.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        debug!("Failed to answer callback query: {}", e);
    }

    let Some(message) = q.message else {
        debug!("Play callback from {} has no originating message", q.from.id);
        return Ok(());
    };
    let chat_id = message.chat().id;
    let profile = PlayerProfile::from(&q.from);
    let user_id = profile.id.to_string();

    match register_player(
        &deps.store,
        &deps.config.bot,
        &deps.config.game,
        &profile,
        referral.as_deref(),
    ) {
        Ok(RegistrationOutcome::Created { referral }) => {
            info!(
                "Registered player {} ({}), referral: {:?}",
                user_id,
                sanitize_for_log(profile.username.as_deref().unwrap_or(FIELD_MISSING), 40),
                referral
            );
        }
        Ok(RegistrationOutcome::AlreadyRegistered) => {
            debug!("Player {} replayed the Play button", user_id);
        }
        Err(e) => {
            // No retry, no rollback; surface a generic message only.
            error!("Error storing player data for {}: {}", user_id, e);
            bot.send_message(chat_id, STORE_ERROR_MESSAGE).await?;
            return Ok(());
        }
    }

    let game_url = Url::parse(&format!(
        "{}?userId={}",
        deps.config.bot.game_url, user_id
    ))?;
    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        "Start Mining Clover 🍀",
        game_url,
    )]]);
    bot.edit_message_reply_markup(chat_id, message.id())
        .reply_markup(keyboard)
        .await?;
    Ok(())
}
