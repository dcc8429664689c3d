//! Authentication routes: `/api/auth/*`
//!
//! There is no token or session protocol — login verifies a username/secret
//! pair and returns the account profile; the client keeps the owner name and
//! passes it on subsequent requests.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use passfold_core::model::AccountProfile;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/auth` router.
///
/// Paths:
/// - `POST /api/auth/login` — verify credentials
/// - `POST /api/auth/update-credentials` — change username and/or secret
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/update-credentials", post(update_credentials))
}

// ── Request/response types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialsRequest {
    pub current_username: String,
    pub current_secret: String,
    pub new_username: String,
    pub new_secret: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: AccountProfile,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Verify a username/secret pair.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .accounts
        .authenticate(&body.username, &body.secret)
        .await?;
    Ok(Json(AccountResponse { account }))
}

/// Change an account's username and/or secret (re-authenticates first).
async fn update_credentials(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateCredentialsRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .accounts
        .update_credentials(
            &body.current_username,
            &body.current_secret,
            &body.new_username,
            &body.new_secret,
        )
        .await?;
    Ok(Json(AccountResponse { account }))
}
