//! HTTP surface tests for the coin-update endpoint, driven through the
//! router with `tower::ServiceExt::oneshot` (no sockets).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use clovertap::http::{router, ApiAuth, ApiState};
use clovertap::storage::{UserRecord, UserStore};

fn seeded_state(tmpdir: &tempfile::TempDir) -> ApiState {
    let store = UserStore::open(tmpdir.path()).expect("store");
    let user = UserRecord {
        id: 555,
        username: "N/A".into(),
        first_name: "N/A".into(),
        last_name: "N/A".into(),
        level: 1,
        tap_per_click: 2,
        balance: 1000,
        energy: 1000,
        invited: Vec::new(),
        referral_link: "http://t.me/CloverMinerBot?start=555".into(),
        referrer_id: None,
    };
    assert!(store.create_user_if_absent(&user).expect("seed"));
    ApiState {
        store: Arc::new(store),
        auth: None,
    }
}

fn post_update(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/users/updateCoins")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn greeting_endpoint_responds() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let app = router(seeded_state(&tmpdir));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Hello World!");
}

#[tokio::test]
async fn update_applies_delta_and_overwrites_level() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let state = seeded_state(&tmpdir);
    let app = router(state.clone());

    let response = app
        .oneshot(post_update(json!({
            "userId": "555",
            "coinsToAdd": 150,
            "levels": 3
        })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User coins updated successfully");

    let user = state.store.get_user("555").unwrap().unwrap();
    assert_eq!(user.balance, 1150);
    assert_eq!(user.level, 3);
}

#[tokio::test]
async fn numeric_user_id_and_zero_delta_are_accepted() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let state = seeded_state(&tmpdir);
    let app = router(state.clone());

    let response = app
        .oneshot(post_update(json!({ "userId": 555, "coinsToAdd": 0 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let user = state.store.get_user("555").unwrap().unwrap();
    assert_eq!(user.balance, 1000);
    assert_eq!(user.level, 1, "absent levels leaves level unchanged");
}

#[tokio::test]
async fn missing_fields_are_bad_requests_without_mutation() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let state = seeded_state(&tmpdir);
    let app = router(state.clone());

    for body in [
        json!({ "coinsToAdd": 10 }),
        json!({ "userId": "555" }),
        json!({ "userId": "", "coinsToAdd": 10 }),
        json!({ "userId": 0, "coinsToAdd": 10 }),
    ] {
        let response = app.clone().oneshot(post_update(body.clone())).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for {}",
            body
        );
        let error = body_json(response).await;
        assert_eq!(error["error"], "Invalid request data");
    }

    let user = state.store.get_user("555").unwrap().unwrap();
    assert_eq!(user.balance, 1000, "rejected requests must not mutate");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let app = router(seeded_state(&tmpdir));

    let response = app
        .oneshot(post_update(json!({ "userId": "424242", "coinsToAdd": 5 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn configured_auth_gates_updates() {
    let tmpdir = tempfile::tempdir().expect("tempdir");
    let mut state = seeded_state(&tmpdir);
    let auth = ApiAuth::new("hunter2");
    state.auth = Some(auth.clone());
    let app = router(state.clone());

    // No token: rejected.
    let response = app
        .clone()
        .oneshot(post_update(json!({ "userId": "555", "coinsToAdd": 50 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Token for a different user: rejected.
    let mut request = post_update(json!({ "userId": "555", "coinsToAdd": 50 }));
    request
        .headers_mut()
        .insert("x-api-token", auth.token_for("556").parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct per-user token: accepted.
    let mut request = post_update(json!({ "userId": "555", "coinsToAdd": 50 }));
    request
        .headers_mut()
        .insert("x-api-token", auth.token_for("555").parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = state.store.get_user("555").unwrap().unwrap();
    assert_eq!(user.balance, 1050);
}
