//! Credential routes: `/api/credentials/*`
//!
//! Secrets cross this boundary in plaintext (the client edits them); the
//! credential store encrypts on write and decrypts on read. Two write
//! patterns are exposed: per-record CRUD, and the historical whole-set
//! `bulk-replace` used by older clients.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use passfold_core::model::Credential;
use passfold_core::organizer::NewCredential;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/credentials` router.
///
/// Paths:
/// - `GET    /api/credentials?owner=` — list (secrets decrypted)
/// - `POST   /api/credentials` — add one
/// - `PUT    /api/credentials/{id}` — update one
/// - `DELETE /api/credentials/{id}?owner=` — delete one
/// - `POST   /api/credentials/bulk-replace` — replace the whole set
/// - `PUT    /api/credentials/{id}/move` — move into a folder
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_credentials).post(add_credential))
        .route("/bulk-replace", post(bulk_replace))
        .route("/{id}", put(update_credential).delete(delete_credential))
        .route("/{id}/move", put(move_credential))
}

// ── Request/response types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCredentialRequest {
    pub owner: String,
    pub title: String,
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialRequest {
    pub owner: String,
    pub title: String,
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReplaceRequest {
    pub owner: String,
    pub credentials: Vec<Credential>,
}

#[derive(Debug, Serialize)]
pub struct BulkReplaceResponse {
    pub replaced: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCredentialRequest {
    pub owner: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// List all credentials for an owner, secrets decrypted.
async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Credential>>, AppError> {
    let credentials = state.credentials.list(&query.owner).await?;
    Ok(Json(credentials))
}

/// Add a single credential.
async fn add_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddCredentialRequest>,
) -> Result<Json<Credential>, AppError> {
    let credential = state
        .organizer
        .add_credential(
            &body.owner,
            NewCredential {
                title: body.title,
                username: body.username,
                secret: body.secret,
                description: body.description,
            },
            body.folder_id.as_deref(),
        )
        .await?;
    Ok(Json(credential))
}

/// Update a credential in place.
async fn update_credential(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCredentialRequest>,
) -> Result<Json<Credential>, AppError> {
    let credential = state
        .credentials
        .update(
            &body.owner,
            &id,
            Credential {
                id: id.clone(),
                title: body.title,
                username: body.username,
                secret: body.secret,
                description: body.description,
                folder_id: body.folder_id,
                owner_id: body.owner.clone(),
            },
        )
        .await?;
    Ok(Json(credential))
}

/// Delete a single credential.
async fn delete_credential(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    state.credentials.delete(&query.owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the owner's whole credential set (historical save pattern;
/// last writer wins).
async fn bulk_replace(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkReplaceRequest>,
) -> Result<Json<BulkReplaceResponse>, AppError> {
    let replaced = body.credentials.len();
    state
        .credentials
        .bulk_replace(&body.owner, body.credentials)
        .await?;
    Ok(Json(BulkReplaceResponse { replaced }))
}

/// Move a credential into a folder (absent = the owner's root).
async fn move_credential(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<MoveCredentialRequest>,
) -> Result<Json<Credential>, AppError> {
    let credential = state
        .credentials
        .move_to_folder(&body.owner, &id, body.folder_id.as_deref())
        .await?;
    Ok(Json(credential))
}
