//! Registration behavior of the Play handler core, exercised directly
//! against a throwaway store.

use clovertap::bot::play::{register_player, PlayerProfile, RegistrationOutcome};
use clovertap::config::{BotConfig, GameConfig};
use clovertap::storage::{ReferralOutcome, UserStore};

fn bot_config() -> BotConfig {
    BotConfig {
        token: String::new(),
        game_url: "http://t.me/CloverMinerBot/ClovrMaster/".to_string(),
        referral_base_url: "http://t.me/CloverMinerBot".to_string(),
        channel_url: "https://t.me/+example".to_string(),
    }
}

fn profile(id: u64) -> PlayerProfile {
    PlayerProfile {
        id,
        username: Some(format!("player{}", id)),
        first_name: "Ada".to_string(),
        last_name: None,
    }
}

#[test]
fn first_play_creates_record_with_defaults() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let store = UserStore::open(tmpdir.path()).expect("store");

    let outcome = register_player(&store, &bot_config(), &GameConfig::default(), &profile(100), None)
        .expect("register");
    assert_eq!(outcome, RegistrationOutcome::Created { referral: None });

    let user = store.get_user("100").unwrap().expect("record created");
    assert_eq!(user.id, 100);
    assert_eq!(user.username, "player100");
    assert_eq!(user.first_name, "Ada");
    assert_eq!(user.last_name, "N/A");
    assert_eq!(user.level, 1);
    assert_eq!(user.tap_per_click, 2);
    assert_eq!(user.balance, 0);
    assert_eq!(user.energy, 1000);
    assert!(user.invited.is_empty());
    assert_eq!(user.referral_link, "http://t.me/CloverMinerBot?start=100");
    assert!(user.referrer_id.is_none());
}

#[test]
fn missing_display_fields_default_to_sentinel() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let store = UserStore::open(tmpdir.path()).expect("store");
    let anonymous = PlayerProfile {
        id: 7,
        username: None,
        first_name: "Ada".to_string(),
        last_name: None,
    };

    register_player(&store, &bot_config(), &GameConfig::default(), &anonymous, None)
        .expect("register");
    let user = store.get_user("7").unwrap().unwrap();
    assert_eq!(user.username, "N/A");
    assert_eq!(user.last_name, "N/A");
}

#[test]
fn replaying_play_is_idempotent() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let store = UserStore::open(tmpdir.path()).expect("store");
    let game = GameConfig::default();

    // Seed a referrer so the second Play could, if buggy, re-attribute.
    register_player(&store, &bot_config(), &game, &profile(1), None).expect("referrer");
    register_player(&store, &bot_config(), &game, &profile(2), Some("1")).expect("first play");

    let before = store.get_user("2").unwrap().unwrap();
    let outcome =
        register_player(&store, &bot_config(), &game, &profile(2), Some("1")).expect("replay");
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);

    let after = store.get_user("2").unwrap().unwrap();
    assert_eq!(after, before, "replay must not change the record");
    let referrer = store.get_user("1").unwrap().unwrap();
    assert_eq!(referrer.invited.len(), 1, "no duplicate bonus on replay");
    assert_eq!(referrer.balance, game.referral_bonus);
}

#[test]
fn unknown_referrer_leaves_new_player_unbonused() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let store = UserStore::open(tmpdir.path()).expect("store");

    let outcome = register_player(
        &store,
        &bot_config(),
        &GameConfig::default(),
        &profile(3),
        Some("999999"),
    )
    .expect("register");
    assert_eq!(
        outcome,
        RegistrationOutcome::Created {
            referral: Some(ReferralOutcome::ReferrerMissing)
        }
    );

    let user = store.get_user("3").unwrap().unwrap();
    assert_eq!(user.balance, 0);
    assert!(user.referrer_id.is_none());
}

#[test]
fn successful_referral_credits_both_sides() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let store = UserStore::open(tmpdir.path()).expect("store");
    let game = GameConfig::default();

    register_player(&store, &bot_config(), &game, &profile(10), None).expect("referrer");
    let outcome =
        register_player(&store, &bot_config(), &game, &profile(11), Some("10")).expect("invitee");
    assert_eq!(
        outcome,
        RegistrationOutcome::Created {
            referral: Some(ReferralOutcome::Attributed)
        }
    );

    let referrer = store.get_user("10").unwrap().unwrap();
    assert_eq!(referrer.invited, vec!["11".to_string()]);
    assert_eq!(referrer.balance, game.referral_bonus);

    let invitee = store.get_user("11").unwrap().unwrap();
    assert_eq!(invitee.balance, game.referral_bonus);
    assert_eq!(invitee.referrer_id.as_deref(), Some("10"));
}
