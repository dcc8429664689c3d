//! Account management routes: `/api/accounts/*`
//!
//! Administrator-only by client convention — there is no session protocol,
//! so the server cannot enforce the role here (the historical deployments
//! relied on the client gating these screens).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use passfold_core::model::AccountProfile;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/accounts` router.
///
/// Paths:
/// - `GET    /api/accounts` — list accounts (secrets projected out)
/// - `POST   /api/accounts` — create an account
/// - `DELETE /api/accounts/{username}` — delete account + namespace
/// - `PUT    /api/accounts/{username}/secret` — reset an account's secret
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/{username}", axum::routing::delete(delete_account))
        .route("/{username}/secret", put(set_secret))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub username: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSecretRequest {
    pub secret: String,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// List all accounts, secrets projected out.
async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AccountProfile>>, AppError> {
    let accounts = state.accounts.list_accounts().await?;
    Ok(Json(accounts))
}

/// Create a new account.
async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountProfile>, AppError> {
    let account = state
        .accounts
        .create_account(&body.username, &body.secret)
        .await?;
    Ok(Json(account))
}

/// Delete an account and its whole folder/credential namespace.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<StatusCode, AppError> {
    state.accounts.delete_account(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reset an account's secret (always stored encrypted).
async fn set_secret(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(body): Json<SetSecretRequest>,
) -> Result<StatusCode, AppError> {
    state.accounts.set_secret(&username, &body.secret).await?;
    Ok(StatusCode::NO_CONTENT)
}
