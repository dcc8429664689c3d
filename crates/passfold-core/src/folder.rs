//! Folder store: per-owner CRUD over the folder tree.
//!
//! Folders are JSON documents under `vault/{owner}/folders/{id}`. The store
//! enforces the tree invariants at mutation time: a parent must exist in the
//! same namespace, and a reparent may never make a folder its own ancestor.
//! Cascading delete is an organization-service concern — [`FolderStore::delete`]
//! removes exactly one record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use passfold_storage::StorageBackend;

use crate::error::FolderError;
use crate::model::Folder;

/// Per-owner folder storage.
pub struct FolderStore {
    storage: Arc<dyn StorageBackend>,
}

impl FolderStore {
    /// Create a folder store over the given backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    fn key(owner: &str, id: &str) -> String {
        format!("vault/{owner}/folders/{id}")
    }

    fn prefix(owner: &str) -> String {
        format!("vault/{owner}/folders/")
    }

    fn decode(bytes: &[u8]) -> Result<Folder, FolderError> {
        serde_json::from_slice(bytes).map_err(|e| FolderError::Serialization {
            reason: e.to_string(),
        })
    }

    fn encode(folder: &Folder) -> Result<Vec<u8>, FolderError> {
        serde_json::to_vec(folder).map_err(|e| FolderError::Serialization {
            reason: e.to_string(),
        })
    }

    /// List all folders for an owner. Order is not significant.
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::Storage`] or [`FolderError::Serialization`] on
    /// backend or decode failures.
    pub async fn list(&self, owner: &str) -> Result<Vec<Folder>, FolderError> {
        let keys = self.storage.list(&Self::prefix(owner)).await?;
        let mut folders = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.storage.get(&key).await? {
                folders.push(Self::decode(&bytes)?);
            }
        }
        Ok(folders)
    }

    /// Fetch a single folder.
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::NotFound`] if the folder does not exist for
    /// this owner.
    pub async fn get(&self, owner: &str, id: &str) -> Result<Folder, FolderError> {
        let bytes = self
            .storage
            .get(&Self::key(owner, id))
            .await?
            .ok_or_else(|| FolderError::NotFound { id: id.to_owned() })?;
        Self::decode(&bytes)
    }

    /// Create a folder under the given parent (`None` = root).
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::Validation`] for an empty name and
    /// [`FolderError::InvalidParent`] when the parent does not exist in this
    /// owner's namespace.
    pub async fn create(
        &self,
        owner: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, FolderError> {
        if name.trim().is_empty() {
            return Err(FolderError::Validation {
                reason: "folder name must not be empty".to_owned(),
            });
        }
        if let Some(parent) = parent_id {
            if !self.storage.exists(&Self::key(owner, parent)).await? {
                return Err(FolderError::InvalidParent {
                    id: parent.to_owned(),
                });
            }
        }

        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            parent_id: parent_id.map(ToOwned::to_owned),
            owner_id: owner.to_owned(),
            created_at: now,
            updated_at: now,
        };
        self.storage
            .put(&Self::key(owner, &folder.id), &Self::encode(&folder)?)
            .await?;
        tracing::debug!(owner, folder_id = %folder.id, "folder created");
        Ok(folder)
    }

    /// Rename a folder, bumping `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::NotFound`] if absent and
    /// [`FolderError::Validation`] for an empty name.
    pub async fn rename(&self, owner: &str, id: &str, name: &str) -> Result<Folder, FolderError> {
        if name.trim().is_empty() {
            return Err(FolderError::Validation {
                reason: "folder name must not be empty".to_owned(),
            });
        }
        let mut folder = self.get(owner, id).await?;
        folder.name = name.to_owned();
        folder.updated_at = Utc::now();
        self.storage
            .put(&Self::key(owner, id), &Self::encode(&folder)?)
            .await?;
        Ok(folder)
    }

    /// Move a folder under a new parent (`None` = root), bumping `updatedAt`.
    ///
    /// The no-cycle invariant is checked against the descendant closure of
    /// the folder being moved; nothing is persisted when a check fails, so
    /// no intermediate state is ever observable.
    ///
    /// # Errors
    ///
    /// - [`FolderError::NotFound`] if the folder is absent.
    /// - [`FolderError::CycleDetected`] if the new parent is the folder
    ///   itself or one of its descendants.
    /// - [`FolderError::InvalidParent`] if the new parent is non-null and
    ///   does not exist in this owner's namespace.
    pub async fn reparent(
        &self,
        owner: &str,
        id: &str,
        new_parent: Option<&str>,
    ) -> Result<Folder, FolderError> {
        let mut folder = self.get(owner, id).await?;

        if let Some(parent) = new_parent {
            if parent == id {
                return Err(FolderError::CycleDetected {
                    id: id.to_owned(),
                    new_parent: parent.to_owned(),
                });
            }
            // The listing is owner-scoped, so a cross-namespace parent is
            // simply absent here.
            let all = self.list(owner).await?;
            if !all.iter().any(|f| f.id == parent) {
                return Err(FolderError::InvalidParent {
                    id: parent.to_owned(),
                });
            }
            if descendants_of(&all, id).contains(parent) {
                return Err(FolderError::CycleDetected {
                    id: id.to_owned(),
                    new_parent: parent.to_owned(),
                });
            }
        }

        folder.parent_id = new_parent.map(ToOwned::to_owned);
        folder.updated_at = Utc::now();
        self.storage
            .put(&Self::key(owner, id), &Self::encode(&folder)?)
            .await?;
        tracing::debug!(owner, folder_id = id, new_parent = ?new_parent, "folder moved");
        Ok(folder)
    }

    /// Delete a single folder record. Idempotent; subtree and credential
    /// cleanup belongs to the organization service.
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::Storage`] if the backend fails.
    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), FolderError> {
        self.storage.delete(&Self::key(owner, id)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for FolderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderStore").finish_non_exhaustive()
    }
}

/// Collect the ids of every descendant of `root_id` (excluding `root_id`
/// itself) by walking the parent-pointer adjacency of the loaded folder
/// list.
///
/// Shared by the cycle check, cascading delete, and move-target exclusion —
/// all three must agree on the closure.
#[must_use]
pub fn descendants_of(folders: &[Folder], root_id: &str) -> HashSet<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for folder in folders {
        if let Some(parent) = folder.parent_id.as_deref() {
            children.entry(parent).or_default().push(folder.id.as_str());
        }
    }

    let mut closure = HashSet::new();
    let mut stack = vec![root_id];
    while let Some(current) = stack.pop() {
        if let Some(kids) = children.get(current) {
            for &kid in kids {
                if closure.insert(kid.to_owned()) {
                    stack.push(kid);
                }
            }
        }
    }
    closure
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use passfold_storage::MemoryBackend;

    fn store() -> FolderStore {
        FolderStore::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = store();
        let folder = store.create("alice", "Banking", None).await.unwrap();
        let fetched = store.get("alice", &folder.id).await.unwrap();
        assert_eq!(fetched, folder);
        assert_eq!(fetched.parent_id, None);
    }

    #[tokio::test]
    async fn create_with_missing_parent_fails() {
        let store = store();
        let result = store.create("alice", "Banking", Some("nope")).await;
        assert!(matches!(result, Err(FolderError::InvalidParent { .. })));
    }

    #[tokio::test]
    async fn create_with_empty_name_fails() {
        let store = store();
        let result = store.create("alice", "  ", None).await;
        assert!(matches!(result, Err(FolderError::Validation { .. })));
    }

    #[tokio::test]
    async fn list_is_owner_scoped() {
        let store = store();
        store.create("alice", "A", None).await.unwrap();
        store.create("bob", "B", None).await.unwrap();
        let folders = store.list("alice").await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "A");
    }

    #[tokio::test]
    async fn get_missing_fails_not_found() {
        let store = store();
        let result = store.get("alice", "missing").await;
        assert!(matches!(result, Err(FolderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn rename_updates_name_and_timestamp() {
        let store = store();
        let folder = store.create("alice", "Old", None).await.unwrap();
        let renamed = store.rename("alice", &folder.id, "New").await.unwrap();
        assert_eq!(renamed.name, "New");
        assert!(renamed.updated_at >= folder.updated_at);
    }

    #[tokio::test]
    async fn rename_missing_fails_not_found() {
        let store = store();
        let result = store.rename("alice", "missing", "New").await;
        assert!(matches!(result, Err(FolderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn sibling_names_need_not_be_unique() {
        let store = store();
        store.create("alice", "Dup", None).await.unwrap();
        store.create("alice", "Dup", None).await.unwrap();
        assert_eq!(store.list("alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reparent_moves_folder() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", None).await.unwrap();
        let moved = store.reparent("alice", &b.id, Some(&a.id)).await.unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some(a.id.as_str()));
    }

    #[tokio::test]
    async fn reparent_to_root() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", Some(&a.id)).await.unwrap();
        let moved = store.reparent("alice", &b.id, None).await.unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[tokio::test]
    async fn reparent_to_self_is_a_cycle() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let result = store.reparent("alice", &a.id, Some(&a.id)).await;
        assert!(matches!(result, Err(FolderError::CycleDetected { .. })));
    }

    #[tokio::test]
    async fn reparent_under_descendant_is_a_cycle() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", Some(&a.id)).await.unwrap();
        let c = store.create("alice", "C", Some(&b.id)).await.unwrap();
        // A -> B -> C; moving A under C closes the loop.
        let result = store.reparent("alice", &a.id, Some(&c.id)).await;
        assert!(matches!(result, Err(FolderError::CycleDetected { .. })));
    }

    #[tokio::test]
    async fn reparent_rejected_leaves_folder_unchanged() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", Some(&a.id)).await.unwrap();
        let _ = store.reparent("alice", &a.id, Some(&b.id)).await;
        let reloaded = store.get("alice", &a.id).await.unwrap();
        assert_eq!(reloaded.parent_id, None);
    }

    #[tokio::test]
    async fn reparent_under_missing_parent_fails() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let result = store.reparent("alice", &a.id, Some("missing")).await;
        assert!(matches!(result, Err(FolderError::InvalidParent { .. })));
    }

    #[tokio::test]
    async fn reparent_under_other_owners_folder_fails() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let bobs = store.create("bob", "B", None).await.unwrap();
        let result = store.reparent("alice", &a.id, Some(&bobs.id)).await;
        assert!(matches!(result, Err(FolderError::InvalidParent { .. })));
    }

    #[tokio::test]
    async fn delete_removes_single_record() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", Some(&a.id)).await.unwrap();
        store.delete("alice", &a.id).await.unwrap();
        assert!(matches!(
            store.get("alice", &a.id).await,
            Err(FolderError::NotFound { .. })
        ));
        // The child record is untouched; cascade lives in the organizer.
        assert!(store.get("alice", &b.id).await.is_ok());
    }

    #[tokio::test]
    async fn descendants_of_walks_whole_subtree() {
        let store = store();
        let a = store.create("alice", "A", None).await.unwrap();
        let b = store.create("alice", "B", Some(&a.id)).await.unwrap();
        let c = store.create("alice", "C", Some(&b.id)).await.unwrap();
        let other = store.create("alice", "Other", None).await.unwrap();

        let all = store.list("alice").await.unwrap();
        let closure = descendants_of(&all, &a.id);
        assert!(closure.contains(&b.id));
        assert!(closure.contains(&c.id));
        assert!(!closure.contains(&a.id));
        assert!(!closure.contains(&other.id));
    }
}
