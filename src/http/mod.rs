//! # HTTP API Module - Game Client Surface
//!
//! The game client reports tap-earned coins and level progress through a
//! single mutation endpoint; everything else about the game runs client-side
//! against state it received at launch.
//!
//! | Method | Path                     | Success            | Failure |
//! |--------|--------------------------|--------------------|---------|
//! | GET    | `/`                      | `200` greeting     | —       |
//! | POST   | `/api/users/updateCoins` | `200 {message}`    | `400` invalid input, `401` bad token, `404` unknown user, `500` store error |
//!
//! CORS is permissive: the client is a static web app served from wherever
//! Telegram's mini-app infrastructure puts it.
//!
//! ## Authorization
//!
//! The endpoint is trusted-client only by convention. When `[api]
//! auth_secret` is configured, a policy layer requires
//! `x-api-token: hex(sha256("{secret}:{userId}"))` on every update; the
//! update logic itself stays auth-agnostic. Unset means open, matching the
//! original deployment.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tower_http::cors::CorsLayer;

use crate::metrics;
use crate::storage::{StoreError, UserStore};
use crate::validation::validate_user_id;

/// Per-user token derivation for the coin-update auth layer.
#[derive(Clone)]
pub struct ApiAuth {
    secret: String,
}

impl ApiAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Token the caller must present for `user_id`:
    /// `hex(sha256("{secret}:{user_id}"))`.
    pub fn token_for(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(user_id.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn authorize(&self, headers: &HeaderMap, user_id: &str) -> Result<(), ApiError> {
        let presented = headers
            .get("x-api-token")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        if presented == self.token_for(user_id) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<UserStore>,
    pub auth: Option<ApiAuth>,
}

/// JSON error responses with the status codes the game client expects.
#[derive(Debug, PartialEq, Eq)]
enum ApiError {
    InvalidRequest,
    Unauthorized,
    UserNotFound,
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request data"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or missing API token"),
            ApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The client may send the user id as a JSON string or number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserIdField {
    Number(i64),
    Text(String),
}

impl UserIdField {
    /// String-coerced id, rejecting falsy values (`0`, empty) the same way
    /// the client-facing contract always has.
    fn as_key(&self) -> Option<String> {
        match self {
            UserIdField::Number(0) => None,
            UserIdField::Number(n) => Some(n.to_string()),
            UserIdField::Text(s) if s.trim().is_empty() => None,
            UserIdField::Text(s) => Some(s.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCoinsRequest {
    #[serde(default)]
    user_id: Option<UserIdField>,
    /// A delta, not an absolute value. `0` is valid; negative is allowed.
    #[serde(default)]
    coins_to_add: Option<i64>,
    /// Overwrites the stored level when present; absent leaves it unchanged.
    #[serde(default)]
    levels: Option<i64>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/users/updateCoins", post(update_coins))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve<F>(state: ApiState, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn root() -> &'static str {
    "Hello World!"
}

async fn update_coins(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<UpdateCoinsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = request
        .user_id
        .as_ref()
        .and_then(UserIdField::as_key)
        .and_then(|id| validate_user_id(&id).ok())
        .ok_or_else(|| {
            metrics::inc_coin_updates_rejected();
            ApiError::InvalidRequest
        })?;
    let Some(coins_to_add) = request.coins_to_add else {
        metrics::inc_coin_updates_rejected();
        return Err(ApiError::InvalidRequest);
    };

    if let Some(auth) = &state.auth {
        auth.authorize(&headers, &user_id).map_err(|e| {
            metrics::inc_coin_updates_rejected();
            e
        })?;
    }

    match state.store.update_coins(&user_id, coins_to_add, request.levels) {
        Ok(user) => {
            metrics::inc_coin_updates();
            info!(
                "Updated coins for {}: {:+} -> balance {}, level {}",
                user_id, coins_to_add, user.balance, user.level
            );
            Ok(Json(json!({ "message": "User coins updated successfully" })))
        }
        Err(StoreError::UserNotFound(_)) => Err(ApiError::UserNotFound),
        Err(e) => {
            error!("Error updating coins for {}: {}", user_id, e);
            Err(ApiError::Internal)
        }
    }
}
