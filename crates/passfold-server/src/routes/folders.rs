//! Folder routes: `/api/folders/*` plus the tree view endpoints.
//!
//! All operations are scoped by the `owner` body field or query parameter.
//! Deleting a folder cascades through its whole subtree.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use passfold_core::model::{Folder, MoveTarget, PathSegment};
use passfold_core::organizer::Listing;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/api/folders` router.
///
/// Paths:
/// - `GET    /api/folders?owner=` — list all folders
/// - `POST   /api/folders` — create
/// - `PUT    /api/folders/{id}` — rename
/// - `DELETE /api/folders/{id}?owner=` — cascading delete
/// - `PUT    /api/folders/{id}/move` — reparent (cycle-checked)
/// - `GET    /api/folders/{id}/path?owner=` — breadcrumb path
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/{id}", put(rename_folder).delete(delete_folder))
        .route("/{id}/move", put(move_folder))
        .route("/{id}/path", get(folder_path))
}

/// Build the tree view router nested directly under `/api`.
///
/// Paths:
/// - `GET /api/listing?owner=&folder=` — one folder level's contents
/// - `GET /api/move-targets?owner=&exclude=` — folders a move may target
pub fn views_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listing", get(listing))
        .route("/move-targets", get(move_targets))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFolderRequest {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFolderRequest {
    pub owner: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub owner: String,
    /// Absent = the owner's root level.
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveTargetsQuery {
    pub owner: String,
    /// Folder whose subtree to exclude (the folder being moved).
    #[serde(default)]
    pub exclude: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// List all folders for an owner.
async fn list_folders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Folder>>, AppError> {
    let folders = state.folders.list(&query.owner).await?;
    Ok(Json(folders))
}

/// Create a folder under the given parent (absent = root).
async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateFolderRequest>,
) -> Result<Json<Folder>, AppError> {
    let folder = state
        .folders
        .create(&body.owner, &body.name, body.parent_id.as_deref())
        .await?;
    Ok(Json(folder))
}

/// Rename a folder.
async fn rename_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RenameFolderRequest>,
) -> Result<Json<Folder>, AppError> {
    let folder = state.folders.rename(&body.owner, &id, &body.name).await?;
    Ok(Json(folder))
}

/// Delete a folder, its subtree, and every credential inside.
async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    state
        .organizer
        .delete_folder_cascade(&query.owner, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move a folder under a new parent (absent = root).
async fn move_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<MoveFolderRequest>,
) -> Result<Json<Folder>, AppError> {
    let folder = state
        .organizer
        .move_folder(&body.owner, &id, body.parent_id.as_deref())
        .await?;
    Ok(Json(folder))
}

/// Breadcrumb path for a folder, root first.
async fn folder_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<PathSegment>>, AppError> {
    let path = state
        .organizer
        .breadcrumb_path(&query.owner, Some(&id))
        .await?;
    Ok(Json(path))
}

/// Contents of one folder level (absent `folder` = root).
async fn listing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Listing>, AppError> {
    let listing = state
        .organizer
        .listing_for(&query.owner, query.folder.as_deref())
        .await?;
    Ok(Json(listing))
}

/// Folders a move may target, minus the excluded subtree.
async fn move_targets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoveTargetsQuery>,
) -> Result<Json<Vec<MoveTarget>>, AppError> {
    let targets = state
        .organizer
        .eligible_move_targets(&query.owner, query.exclude.as_deref())
        .await?;
    Ok(Json(targets))
}
