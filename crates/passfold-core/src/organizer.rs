//! Organization service: the layer that combines the folder and credential
//! stores.
//!
//! Owns the multi-record operations — cascading folder delete, folder moves,
//! breadcrumb paths, per-folder listings, and move-target enumeration. Tree
//! invariants are validated before any mutation is persisted.
//!
//! The cascade is a sequence of independent single-key deletes (the storage
//! trait has no multi-key transactions), so a crash mid-cascade leaves a
//! partially-deleted subtree. Concurrent readers can briefly observe a
//! credential whose folder is already gone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::credential::CredentialStore;
use crate::error::{CredentialError, OrganizerError};
use crate::folder::{FolderStore, descendants_of};
use crate::model::{Credential, Folder, MoveTarget, PathSegment};

/// Display name of the implicit root in breadcrumbs and move targets.
const ROOT_NAME: &str = "Root";

/// Input for creating a credential; the organizer assigns the id.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub title: String,
    pub username: String,
    pub secret: String,
    pub description: Option<String>,
}

/// The contents of one folder level: immediate subfolders and the
/// credentials housed directly in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub subfolders: Vec<Folder>,
    pub credentials: Vec<Credential>,
}

/// The organization service over an owner's folder tree and credentials.
pub struct Organizer {
    folders: Arc<FolderStore>,
    credentials: Arc<CredentialStore>,
}

impl Organizer {
    /// Create an organizer over the given stores.
    #[must_use]
    pub fn new(folders: Arc<FolderStore>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            folders,
            credentials,
        }
    }

    /// Add a credential, assigning its id and placing it in the given folder
    /// (`None` = the owner's root).
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Validation`] when the title is empty.
    /// - [`crate::error::FolderError::NotFound`] when a non-null target
    ///   folder does not exist (an orphaned record would be unreachable in
    ///   every listing).
    pub async fn add_credential(
        &self,
        owner: &str,
        data: NewCredential,
        folder_id: Option<&str>,
    ) -> Result<Credential, OrganizerError> {
        if data.title.trim().is_empty() {
            return Err(CredentialError::Validation {
                reason: "credential title must not be empty".to_owned(),
            }
            .into());
        }
        if let Some(folder) = folder_id {
            self.folders.get(owner, folder).await?;
        }

        let credential = Credential {
            id: Uuid::new_v4().to_string(),
            title: data.title,
            username: data.username,
            secret: data.secret,
            description: data.description,
            folder_id: folder_id.map(ToOwned::to_owned),
            owner_id: owner.to_owned(),
        };
        Ok(self.credentials.create(owner, credential).await?)
    }

    /// Delete a folder, its entire descendant subtree, and every credential
    /// housed anywhere in that subtree.
    ///
    /// Each folder in the closure has its credentials deleted before the
    /// folder record itself; the target folder goes last, after its subtree
    /// is gone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FolderError::NotFound`] when the target does
    /// not exist. Storage failures mid-cascade leave a partially-deleted
    /// subtree (documented race).
    pub async fn delete_folder_cascade(
        &self,
        owner: &str,
        folder_id: &str,
    ) -> Result<(), OrganizerError> {
        self.folders.get(owner, folder_id).await?;

        let all = self.folders.list(owner).await?;
        let subtree = descendants_of(&all, folder_id);
        let mut removed_credentials = 0;

        for id in &subtree {
            removed_credentials += self.credentials.delete_in_folder(owner, id).await?;
            self.folders.delete(owner, id).await?;
        }
        removed_credentials += self.credentials.delete_in_folder(owner, folder_id).await?;
        self.folders.delete(owner, folder_id).await?;

        tracing::info!(
            owner,
            folder_id,
            folders = subtree.len() + 1,
            credentials = removed_credentials,
            "folder subtree deleted"
        );
        Ok(())
    }

    /// Move a folder under a new parent, enforcing the cycle and
    /// invalid-parent checks.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::FolderError`] from the reparent.
    pub async fn move_folder(
        &self,
        owner: &str,
        folder_id: &str,
        new_parent: Option<&str>,
    ) -> Result<Folder, OrganizerError> {
        Ok(self.folders.reparent(owner, folder_id, new_parent).await?)
    }

    /// Compute the root-to-leaf breadcrumb path for a folder.
    ///
    /// The path always begins with the implicit root segment
    /// `{id: null, name: "Root"}`; a `None` folder id yields exactly that
    /// single segment, and a folder at depth N yields N+1 segments with the
    /// target last.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FolderError::NotFound`] when the target
    /// folder does not exist.
    pub async fn breadcrumb_path(
        &self,
        owner: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<PathSegment>, OrganizerError> {
        let mut segments = vec![PathSegment {
            id: None,
            name: ROOT_NAME.to_owned(),
        }];

        if let Some(target_id) = folder_id {
            let all = self.folders.list(owner).await?;
            let by_id: HashMap<&str, &Folder> =
                all.iter().map(|f| (f.id.as_str(), f)).collect();
            let target = by_id
                .get(target_id)
                .copied()
                .ok_or_else(|| crate::error::FolderError::NotFound {
                    id: target_id.to_owned(),
                })?;
            for folder in ancestry(&by_id, target) {
                segments.push(PathSegment {
                    id: Some(folder.id.clone()),
                    name: folder.name.clone(),
                });
            }
        }
        Ok(segments)
    }

    /// List the immediate contents of one folder level (`None` = root):
    /// subfolders whose `parentId` matches exactly, and credentials whose
    /// `folderId` matches exactly.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn listing_for(
        &self,
        owner: &str,
        folder_id: Option<&str>,
    ) -> Result<Listing, OrganizerError> {
        let subfolders = self
            .folders
            .list(owner)
            .await?
            .into_iter()
            .filter(|f| f.parent_id.as_deref() == folder_id)
            .collect();
        let credentials = self
            .credentials
            .list(owner)
            .await?
            .into_iter()
            .filter(|c| c.folder_id.as_deref() == folder_id)
            .collect();
        Ok(Listing {
            subfolders,
            credentials,
        })
    }

    /// Enumerate the folders something may be moved into.
    ///
    /// When `exclude` names a folder, that folder and its whole descendant
    /// subtree are omitted — the UI uses this to keep cycle-creating targets
    /// out of the picker. Each entry carries its root-to-leaf display path;
    /// the implicit root is pinned first and the rest sort by path.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn eligible_move_targets(
        &self,
        owner: &str,
        exclude: Option<&str>,
    ) -> Result<Vec<MoveTarget>, OrganizerError> {
        let all = self.folders.list(owner).await?;

        let excluded: HashSet<String> = match exclude {
            Some(id) => {
                let mut set = descendants_of(&all, id);
                set.insert(id.to_owned());
                set
            }
            None => HashSet::new(),
        };

        let by_id: HashMap<&str, &Folder> = all.iter().map(|f| (f.id.as_str(), f)).collect();
        let mut targets: Vec<MoveTarget> = all
            .iter()
            .filter(|f| !excluded.contains(&f.id))
            .map(|folder| {
                let names: Vec<&str> = ancestry(&by_id, folder)
                    .into_iter()
                    .map(|f| f.name.as_str())
                    .collect();
                MoveTarget {
                    id: Some(folder.id.clone()),
                    name: folder.name.clone(),
                    full_path: format!("{ROOT_NAME}/{}", names.join("/")),
                }
            })
            .collect();
        targets.sort_by(|a, b| a.full_path.cmp(&b.full_path));

        let mut result = Vec::with_capacity(targets.len() + 1);
        result.push(MoveTarget {
            id: None,
            name: ROOT_NAME.to_owned(),
            full_path: ROOT_NAME.to_owned(),
        });
        result.extend(targets);
        Ok(result)
    }
}

impl std::fmt::Debug for Organizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organizer").finish_non_exhaustive()
    }
}

/// Walk parent pointers from `target` up to its root, returning the chain
/// root-first (target included last).
///
/// Stops at a dangling parent (possible after an interrupted cascade) or a
/// repeated id, so corrupted data cannot loop forever.
fn ancestry<'a>(by_id: &HashMap<&str, &'a Folder>, target: &'a Folder) -> Vec<&'a Folder> {
    let mut chain = vec![target];
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(target.id.as_str());

    let mut current = target;
    while let Some(parent_id) = current.parent_id.as_deref() {
        match by_id.get(parent_id) {
            Some(&parent) if visited.insert(parent.id.as_str()) => {
                chain.push(parent);
                current = parent;
            }
            _ => break,
        }
    }
    chain.reverse();
    chain
}
