//! Shared application state for the Passfold server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Every component receives its dependencies
//! (storage backend, secret codec) explicitly at construction — there is no
//! process-global connection.

use std::sync::Arc;

use passfold_core::account::AccountDirectory;
use passfold_core::credential::CredentialStore;
use passfold_core::folder::FolderStore;
use passfold_core::organizer::Organizer;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Folder tree CRUD.
    pub folders: Arc<FolderStore>,
    /// Credential CRUD with secret encryption at rest.
    pub credentials: Arc<CredentialStore>,
    /// Moves, cascading deletes, breadcrumbs, listings, move targets.
    pub organizer: Arc<Organizer>,
    /// Account management and authentication.
    pub accounts: Arc<AccountDirectory>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
