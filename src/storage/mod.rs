//! # Storage Module - User Persistence Layer
//!
//! Sled-backed document store holding one record per player, keyed by the
//! string form of the Telegram user id. Documents are camelCase JSON so the
//! stored shape matches what the game client exchanges over HTTP.
//!
//! ## Concurrency
//!
//! The store is the only shared mutable resource in the system and its
//! primitives are the sole concurrency-safety mechanism:
//!
//! - **Guarded creation** uses compare-and-swap against an absent key, so two
//!   concurrent Play callbacks for the same new player resolve to exactly one
//!   creation; the loser observes "already exists" and skips attribution.
//! - **Referral attribution** reads both records and writes both records
//!   inside a single sled transaction. A crash or conflict can no longer
//!   leave the referrer credited without the invitee (or vice versa).
//! - **Coin updates** are transactional read-modify-writes: concurrent
//!   balance deltas commute, while `level` stays last-write-wins by design.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clovertap::storage::UserStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = UserStore::open("./data")?;
//!     if let Some(user) = store.get_user("12345")? {
//!         println!("{} has {} coins", user.id, user.balance);
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::IVec;
use thiserror::Error;

const TREE_USERS: &str = "users";

/// Errors that can arise while interacting with the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when mutating a record that is not present.
    #[error("user not found: {0}")]
    UserNotFound(String),
}

/// One player's persistent game state. Serialized field names mirror the
/// JSON the game client sees, hence camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Platform-native numeric user identifier; the store key is its string form.
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Overwritten (not incremented) by coin updates.
    pub level: i64,
    /// Fixed at creation; the game client applies it locally per tap.
    pub tap_per_click: i64,
    pub balance: i64,
    pub energy: i64,
    /// Ordered set of user ids this player referred; union-only growth.
    #[serde(default)]
    pub invited: Vec<String>,
    /// Deep link embedding this player's own id.
    pub referral_link: String,
    /// Set at most once, when a referral was attributed at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<String>,
}

impl UserRecord {
    /// Store key for this record.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Result of a referral attribution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// Both sides were credited as a matched pair.
    Attributed,
    /// The referral code named a player that does not exist; nothing was written.
    ReferrerMissing,
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct UserStoreBuilder {
    path: PathBuf,
}

impl UserStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<UserStore, StoreError> {
        UserStore::open(self.path)
    }
}

/// Sled-backed persistence for player records.
pub struct UserStore {
    _db: sled::Db,
    users: sled::Tree,
}

impl UserStore {
    /// Open (or create) the user store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let users = db.open_tree(TREE_USERS)?;
        Ok(Self { _db: db, users })
    }

    fn serialize(record: &UserRecord) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(record)?)
    }

    fn deserialize(bytes: IVec) -> Result<UserRecord, StoreError> {
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch a snapshot of a player record, or `None` if it does not exist.
    pub fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        match self.users.get(user_id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Create a player record only if the key is still absent. Returns `true`
    /// when this call performed the creation. Two racing registrations for
    /// the same id resolve atomically: exactly one caller sees `true`.
    pub fn create_user_if_absent(&self, record: &UserRecord) -> Result<bool, StoreError> {
        let key = record.key();
        let bytes = Self::serialize(record)?;
        let swap = self
            .users
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(bytes))?;
        if swap.is_ok() {
            self.users.flush()?;
        }
        Ok(swap.is_ok())
    }

    /// Credit a referral as a matched pair inside one transaction.
    ///
    /// When the referrer exists: the referrer's `invited` set gains
    /// `new_user_id` and their balance grows by `bonus`; the new user's
    /// balance is overwritten to `bonus` (absolute set, the record was just
    /// created with balance 0) and `referrerId` is recorded. When the
    /// referrer does not exist nothing is written.
    ///
    /// A player naming themself as referrer is not rejected here; the two
    /// updates collapse onto the single record in order, matching what two
    /// sequential document updates would produce.
    pub fn attribute_referral(
        &self,
        referrer_id: &str,
        new_user_id: &str,
        bonus: i64,
    ) -> Result<ReferralOutcome, StoreError> {
        let result = self.users.transaction(|tx| {
            let referrer_bytes = match tx.get(referrer_id.as_bytes())? {
                Some(bytes) => bytes,
                None => return Ok(ReferralOutcome::ReferrerMissing),
            };
            let mut referrer: UserRecord = serde_json::from_slice(&referrer_bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;

            if !referrer.invited.iter().any(|id| id == new_user_id) {
                referrer.invited.push(new_user_id.to_string());
            }
            referrer.balance += bonus;

            if referrer_id == new_user_id {
                // Self-referral: both halves of the pair land on one record.
                referrer.balance = bonus;
                referrer.referrer_id = Some(referrer_id.to_string());
                let bytes = serde_json::to_vec(&referrer)
                    .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
                tx.insert(referrer_id.as_bytes(), bytes)?;
                return Ok(ReferralOutcome::Attributed);
            }

            let new_user_bytes = match tx.get(new_user_id.as_bytes())? {
                Some(bytes) => bytes,
                None => {
                    return Err(ConflictableTransactionError::Abort(
                        StoreError::UserNotFound(new_user_id.to_string()),
                    ))
                }
            };
            let mut new_user: UserRecord = serde_json::from_slice(&new_user_bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
            new_user.balance = bonus;
            new_user.referrer_id = Some(referrer_id.to_string());

            let referrer_out = serde_json::to_vec(&referrer)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
            let new_user_out = serde_json::to_vec(&new_user)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
            tx.insert(referrer_id.as_bytes(), referrer_out)?;
            tx.insert(new_user_id.as_bytes(), new_user_out)?;
            Ok(ReferralOutcome::Attributed)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        };
        self.users.flush()?;
        Ok(outcome)
    }

    /// Apply a coin update from the game client: `balance += delta` and, when
    /// present, `level` overwritten. Returns the updated record.
    ///
    /// The delta may be negative; the trusted client never sends one today
    /// but the contract does not forbid it.
    pub fn update_coins(
        &self,
        user_id: &str,
        delta: i64,
        level: Option<i64>,
    ) -> Result<UserRecord, StoreError> {
        let result = self.users.transaction(|tx| {
            let bytes = match tx.get(user_id.as_bytes())? {
                Some(bytes) => bytes,
                None => {
                    return Err(ConflictableTransactionError::Abort(
                        StoreError::UserNotFound(user_id.to_string()),
                    ))
                }
            };
            let mut user: UserRecord = serde_json::from_slice(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
            user.balance += delta;
            if let Some(level) = level {
                user.level = level;
            }
            let out = serde_json::to_vec(&user)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serde(e)))?;
            tx.insert(user_id.as_bytes(), out)?;
            Ok(user)
        });

        let user = match result {
            Ok(user) => user,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StoreError::Sled(e)),
        };
        self.users.flush()?;
        Ok(user)
    }

    /// Number of registered players.
    pub fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.users.len())
    }

    /// Flush pending writes to disk. Called once during shutdown; every
    /// mutation path already flushes on its own.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.users.flush()?;
        Ok(())
    }
}
