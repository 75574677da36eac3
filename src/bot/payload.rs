//! Callback payload codec.
//!
//! Inline keyboard buttons carry an opaque `action_argument` string. Rather
//! than splitting ad hoc at each call site, payloads are decoded into a
//! tagged variant here, and referral codes are shape-checked before anything
//! downstream sees them.

use log::debug;

use crate::logutil::sanitize_for_log;
use crate::validation::validate_referral_code;

const SEPARATOR: char = '_';
const ACTION_PLAY: &str = "play";

/// Decoded inline-button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// The "Play" button from the welcome prompt. `referral` is present only
    /// when the start command carried a well-formed referral code.
    Play { referral: Option<String> },
}

impl CallbackPayload {
    /// Build the Play payload, dropping malformed referral codes up front so
    /// a bad deep link never round-trips through the keyboard.
    pub fn play(referral: Option<&str>) -> Self {
        let referral = referral
            .and_then(|code| validate_referral_code(code).ok());
        CallbackPayload::Play { referral }
    }

    /// Wire form, e.g. `play_12345` or `play_` when no referral applies.
    pub fn encode(&self) -> String {
        match self {
            CallbackPayload::Play { referral } => {
                format!("{}{}{}", ACTION_PLAY, SEPARATOR, referral.as_deref().unwrap_or(""))
            }
        }
    }

    /// Decode a raw callback string. Unknown actions and unseparated strings
    /// yield `None`; a Play payload with a malformed referral code is still a
    /// Play, just without the referral.
    pub fn parse(raw: &str) -> Option<Self> {
        let (action, argument) = raw.split_once(SEPARATOR)?;
        match action {
            ACTION_PLAY => {
                let referral = match argument {
                    "" => None,
                    code => match validate_referral_code(code) {
                        Ok(code) => Some(code),
                        Err(e) => {
                            debug!(
                                "Dropping malformed referral code '{}': {}",
                                sanitize_for_log(code, 40),
                                e
                            );
                            None
                        }
                    },
                };
                Some(CallbackPayload::Play { referral })
            }
            _ => None,
        }
    }
}
