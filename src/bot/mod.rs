//! # Bot Core Module
//!
//! Telegram-facing half of the backend: the dispatcher schema, the
//! onboarding and play handlers, and referral attribution.
//!
//! ## Components
//!
//! - [`onboarding`] - `/start` and `/help` command handling and the welcome prompt
//! - [`play`] - "Play" callback handling and player registration
//! - [`referral`] - Referral attribution with outcome logging
//! - [`payload`] - Inline-button payload codec
//!
//! ## Two-Step Handshake
//!
//! 1. **Onboarding**: `/start [code]` renders the game guide with a Play
//!    button; the referral code (if any) rides along inside the button's
//!    callback payload. Nothing is persisted yet.
//! 2. **Play**: tapping the button creates the player record if absent,
//!    attributes the referral bonus exactly once, and swaps the prompt's
//!    keyboard for a link into the game client.
//!
//! The handler tree is built by [`schema`] and is usable from integration
//! tests without a live Telegram connection; handlers receive their
//! collaborators through the cloneable [`HandlerDeps`] rather than globals.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;

use crate::config::Config;
use crate::storage::UserStore;

pub mod onboarding;
pub mod payload;
pub mod play;
pub mod referral;

pub use onboarding::Command;
pub use payload::CallbackPayload;

/// Error type for handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies injected into every handler.
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<UserStore>,
    pub config: Arc<Config>,
}

impl HandlerDeps {
    pub fn new(store: Arc<UserStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }
}

/// Build the dispatcher schema: commands first, then callback queries.
/// The same tree serves production and tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let deps = deps_commands.clone();
                    async move { onboarding::handle_command(bot, msg, cmd, deps).await }
                }),
        )
        .branch(
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let deps = deps.clone();
                async move { play::handle_callback(bot, q, deps).await }
            }),
        )
}

/// Run the dispatcher until the process receives Ctrl-C.
pub async fn run(bot: Bot, deps: HandlerDeps) {
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
