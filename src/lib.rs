//! # Clovertap - Telegram Tap-to-Earn Game Backend
//!
//! Clovertap is the server side of a Telegram tap-to-earn game. It onboards
//! players through a two-step `/start` → "Play" handshake, persists per-user
//! game state (balance, level, referrals) in an embedded sled store, and
//! exposes a single HTTP endpoint the game client calls to report tap-earned
//! coins and level progress.
//!
//! ## Features
//!
//! - **Onboarding**: `/start [code]` welcome prompt with a Play button that
//!   carries an optional referral code into registration.
//! - **Referral Attribution**: referrer and invitee are credited as a matched
//!   pair inside a single store transaction, exactly once per new player.
//! - **Coin-Update API**: `POST /api/users/updateCoins` applies a balance
//!   delta and level overwrite from the trusted game client, with an optional
//!   token-based authorization layer.
//! - **Async Design**: Built with Tokio; the bot dispatcher and HTTP server
//!   share one explicitly constructed set of service objects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clovertap::config::Config;
//! use clovertap::storage::UserStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = UserStore::open(&config.storage.data_dir)?;
//!     println!("{} players registered", store.user_count()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - Telegram dispatcher, onboarding and play handlers, referral attribution
//! - [`http`] - Coin-update API surface for the game client
//! - [`storage`] - User document persistence layer
//! - [`config`] - Configuration management
//! - [`validation`] - Input validation for identifiers and referral codes
//!
//! ## Initialization Order
//!
//! Service objects are constructed in `main` and injected into handlers:
//! credentials → user store → bot client → HTTP routes. Teardown runs in
//! reverse: the dispatcher stops, the HTTP server drains, the store flushes.

pub mod bot;
pub mod config;
pub mod http;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod validation;
