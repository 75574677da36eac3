//! Input validation for user identifiers and referral codes.
//!
//! Everything that crosses a trust boundary lands here first: the user id
//! derived from a Telegram callback (normally always present, validated
//! defensively), the user id supplied in the coin-update request body, and
//! the referral code carried inside callback payloads.

use thiserror::Error;

/// Longest accepted user identifier, in characters. Telegram user ids are
/// 64-bit integers, so anything longer than 20 digits is garbage.
pub const MAX_USER_ID_LEN: usize = 32;

/// Referral codes are conventionally the referrer's numeric user id.
pub const MAX_REFERRAL_CODE_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("user id is empty")]
    EmptyUserId,

    #[error("user id is too long (maximum {MAX_USER_ID_LEN} characters)")]
    UserIdTooLong,

    #[error("referral code is empty")]
    EmptyReferralCode,

    #[error("referral code is malformed")]
    MalformedReferralCode,
}

/// Normalize and validate a user identifier: trimmed, non-empty, bounded.
///
/// The bot derives ids from Telegram's numeric sender field, so this mostly
/// guards the HTTP path where the id arrives as caller-controlled JSON.
pub fn validate_user_id(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUserId);
    }
    if trimmed.chars().count() > MAX_USER_ID_LEN {
        return Err(ValidationError::UserIdTooLong);
    }
    Ok(trimmed.to_string())
}

/// Validate the shape of a referral code before it is used for attribution:
/// 1..=20 ASCII digits. Codes embedded in our own referral links are always
/// numeric user ids, so anything else is a forged or corrupted payload.
pub fn validate_referral_code(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyReferralCode);
    }
    if trimmed.len() > MAX_REFERRAL_CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::MalformedReferralCode);
    }
    Ok(trimmed.to_string())
}
