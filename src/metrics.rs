//! Process-local counters for registrations, referrals, and coin updates.
//! Logged once at shutdown; a future exposition endpoint can reuse the
//! snapshot as-is.

use std::sync::atomic::{AtomicU64, Ordering};

static USERS_CREATED: AtomicU64 = AtomicU64::new(0);
static REFERRALS_ATTRIBUTED: AtomicU64 = AtomicU64::new(0);
static REFERRALS_DROPPED: AtomicU64 = AtomicU64::new(0);
static SELF_REFERRALS: AtomicU64 = AtomicU64::new(0);
static COIN_UPDATES: AtomicU64 = AtomicU64::new(0);
static COIN_UPDATES_REJECTED: AtomicU64 = AtomicU64::new(0);

pub fn inc_users_created() {
    USERS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_referrals_attributed() {
    REFERRALS_ATTRIBUTED.fetch_add(1, Ordering::Relaxed);
}

/// A referral code named a referrer that does not exist; the bonus was dropped.
pub fn inc_referrals_dropped() {
    REFERRALS_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_self_referrals() {
    SELF_REFERRALS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_coin_updates() {
    COIN_UPDATES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_coin_updates_rejected() {
    COIN_UPDATES_REJECTED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub users_created: u64,
    pub referrals_attributed: u64,
    pub referrals_dropped: u64,
    pub self_referrals: u64,
    pub coin_updates: u64,
    pub coin_updates_rejected: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        users_created: USERS_CREATED.load(Ordering::Relaxed),
        referrals_attributed: REFERRALS_ATTRIBUTED.load(Ordering::Relaxed),
        referrals_dropped: REFERRALS_DROPPED.load(Ordering::Relaxed),
        self_referrals: SELF_REFERRALS.load(Ordering::Relaxed),
        coin_updates: COIN_UPDATES.load(Ordering::Relaxed),
        coin_updates_rejected: COIN_UPDATES_REJECTED.load(Ordering::Relaxed),
    }
}
