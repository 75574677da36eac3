//! Referral attribution.
//!
//! Given a referrer id (from a decoded referral code) and a freshly created
//! player, credit both parties exactly once. The actual pair-write runs as a
//! single store transaction; this layer adds outcome logging and counters.
//!
//! A player naming themself as referrer is not rejected: the store collapses
//! the pair onto the one record, and the case is logged for visibility.

use log::{info, warn};

use crate::metrics;
use crate::storage::{ReferralOutcome, StoreError, UserStore};

/// Attribute a referral, crediting referrer and invitee as a matched pair.
/// Unknown referrers are silently dropped (logged, no error surfaced).
pub fn attribute(
    store: &UserStore,
    referrer_id: &str,
    new_user_id: &str,
    bonus: i64,
) -> Result<ReferralOutcome, StoreError> {
    if referrer_id == new_user_id {
        warn!("Player {} supplied their own referral code", new_user_id);
        metrics::inc_self_referrals();
    }

    let outcome = store.attribute_referral(referrer_id, new_user_id, bonus)?;
    match outcome {
        ReferralOutcome::Attributed => {
            info!(
                "Referral attributed: {} invited {} (+{} coins each)",
                referrer_id, new_user_id, bonus
            );
            metrics::inc_referrals_attributed();
        }
        ReferralOutcome::ReferrerMissing => {
            info!(
                "Dropping referral for {}: referrer {} not found",
                new_user_id, referrer_id
            );
            metrics::inc_referrals_dropped();
        }
    }
    Ok(outcome)
}
