//! Account directory: per-user namespace management.
//!
//! Accounts are JSON documents under `accounts/{username}`; every folder and
//! credential lives in the owning account's `vault/{username}/…` namespace.
//! Deleting an account purges that namespace; renaming an account remaps it
//! key-by-key.
//!
//! # The bootstrap admin
//!
//! The distinguished `admin` account is created at startup with a plaintext
//! secret, and login accepts both the plaintext and the encrypted stored
//! form for it. This dual path is legacy behavior kept for compatibility
//! with existing deployments (covered by tests); the long-term fix is a
//! hashed-credential scheme for all accounts.

use std::sync::Arc;

use chrono::Utc;

use passfold_storage::StorageBackend;

use crate::crypto::SecretCipher;
use crate::error::AccountError;
use crate::model::{Account, AccountProfile, Role};

/// Username of the distinguished bootstrap administrator.
pub const BOOTSTRAP_ADMIN: &str = "admin";

/// Secret the bootstrap admin is created with.
const BOOTSTRAP_SECRET: &str = "admin";

/// Account storage and authentication.
pub struct AccountDirectory {
    storage: Arc<dyn StorageBackend>,
    cipher: Arc<SecretCipher>,
}

impl AccountDirectory {
    /// Create an account directory over the given backend and codec.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, cipher: Arc<SecretCipher>) -> Self {
        Self { storage, cipher }
    }

    fn key(username: &str) -> String {
        format!("accounts/{username}")
    }

    fn namespace_prefix(owner: &str) -> String {
        format!("vault/{owner}/")
    }

    fn decode(bytes: &[u8]) -> Result<Account, AccountError> {
        serde_json::from_slice(bytes).map_err(|e| AccountError::Serialization {
            reason: e.to_string(),
        })
    }

    fn encode(account: &Account) -> Result<Vec<u8>, AccountError> {
        serde_json::to_vec(account).map_err(|e| AccountError::Serialization {
            reason: e.to_string(),
        })
    }

    async fn load(&self, username: &str) -> Result<Option<Account>, AccountError> {
        match self.storage.get(&Self::key(username)).await? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, account: &Account) -> Result<(), AccountError> {
        self.storage
            .put(&Self::key(&account.username), &Self::encode(account)?)
            .await?;
        Ok(())
    }

    fn validate_username(username: &str) -> Result<(), AccountError> {
        if username.trim().is_empty() {
            return Err(AccountError::Validation {
                reason: "username must not be empty".to_owned(),
            });
        }
        // Usernames become storage key path segments.
        if username.contains('/') {
            return Err(AccountError::Validation {
                reason: "username must not contain '/'".to_owned(),
            });
        }
        Ok(())
    }

    /// Create the bootstrap `admin`/`admin` account if no admin record
    /// exists yet. Called once at startup.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn ensure_bootstrap_admin(&self) -> Result<(), AccountError> {
        if self.load(BOOTSTRAP_ADMIN).await?.is_some() {
            tracing::debug!("admin account already exists");
            return Ok(());
        }
        let account = Account {
            username: BOOTSTRAP_ADMIN.to_owned(),
            // Stored in plaintext; see the module docs.
            secret: BOOTSTRAP_SECRET.to_owned(),
            role: Role::Administrator,
            created_at: Utc::now(),
        };
        self.store(&account).await?;
        tracing::info!("default admin account created");
        Ok(())
    }

    /// Authenticate a username/secret pair.
    ///
    /// For the bootstrap admin, both the plaintext stored form and the
    /// encrypted stored form are accepted. Returns the account sans secret.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] when the username is
    /// unknown or the secret does not match.
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<AccountProfile, AccountError> {
        let Some(account) = self.load(username).await? else {
            return Err(AccountError::InvalidCredentials);
        };

        let valid = if username == BOOTSTRAP_ADMIN {
            account.secret == secret || self.cipher.decrypt_or_raw(&account.secret) == secret
        } else {
            self.cipher.decrypt_or_raw(&account.secret) == secret
        };

        if valid {
            Ok(account.profile())
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    /// Create a new account.
    ///
    /// The secret is stored encrypted, except for the bootstrap admin
    /// (plaintext, see the module docs). The admin gets the administrator
    /// role; everyone else is a user.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::DuplicateUsername`] if the username is taken
    /// and [`AccountError::Validation`] for a malformed username.
    pub async fn create_account(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<AccountProfile, AccountError> {
        Self::validate_username(username)?;
        if self.load(username).await?.is_some() {
            return Err(AccountError::DuplicateUsername {
                username: username.to_owned(),
            });
        }

        let is_admin = username == BOOTSTRAP_ADMIN;
        let account = Account {
            username: username.to_owned(),
            secret: if is_admin {
                secret.to_owned()
            } else {
                self.cipher.encrypt(secret)
            },
            role: if is_admin {
                Role::Administrator
            } else {
                Role::User
            },
            created_at: Utc::now(),
        };
        self.store(&account).await?;
        tracing::info!(username, "account created");
        Ok(account.profile())
    }

    /// Change an account's username and/or secret.
    ///
    /// Re-authenticates with the current pair first. The new secret is
    /// always stored encrypted (including for the admin). On a username
    /// change the account's whole storage namespace is remapped to the new
    /// owner prefix.
    ///
    /// # Errors
    ///
    /// - [`AccountError::InvalidCredentials`] when re-authentication fails.
    /// - [`AccountError::DuplicateUsername`] when the new username is taken.
    /// - [`AccountError::Validation`] for a malformed new username.
    pub async fn update_credentials(
        &self,
        current_username: &str,
        current_secret: &str,
        new_username: &str,
        new_secret: &str,
    ) -> Result<AccountProfile, AccountError> {
        self.authenticate(current_username, current_secret).await?;

        let renamed = new_username != current_username;
        if renamed {
            Self::validate_username(new_username)?;
            if self.load(new_username).await?.is_some() {
                return Err(AccountError::DuplicateUsername {
                    username: new_username.to_owned(),
                });
            }
        }

        let Some(existing) = self.load(current_username).await? else {
            return Err(AccountError::InvalidCredentials);
        };
        let account = Account {
            username: new_username.to_owned(),
            secret: self.cipher.encrypt(new_secret),
            role: existing.role,
            created_at: existing.created_at,
        };
        self.store(&account).await?;

        if renamed {
            self.storage.delete(&Self::key(current_username)).await?;
            self.rename_namespace(current_username, new_username).await?;
        }

        tracing::info!(
            username = new_username,
            renamed,
            "account credentials updated"
        );
        Ok(account.profile())
    }

    /// Reset an account's secret (administrator operation). Always stores
    /// the new secret encrypted, including for the admin account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if the account does not exist.
    pub async fn set_secret(&self, username: &str, secret: &str) -> Result<(), AccountError> {
        let Some(mut account) = self.load(username).await? else {
            return Err(AccountError::NotFound {
                username: username.to_owned(),
            });
        };
        account.secret = self.cipher.encrypt(secret);
        self.store(&account).await?;
        Ok(())
    }

    /// Delete an account and purge its entire folder/credential namespace.
    ///
    /// # Errors
    ///
    /// - [`AccountError::ProtectedAccount`] for the bootstrap admin.
    /// - [`AccountError::NotFound`] if the account does not exist.
    pub async fn delete_account(&self, username: &str) -> Result<(), AccountError> {
        if username == BOOTSTRAP_ADMIN {
            return Err(AccountError::ProtectedAccount {
                username: username.to_owned(),
            });
        }
        if self.load(username).await?.is_none() {
            return Err(AccountError::NotFound {
                username: username.to_owned(),
            });
        }

        self.storage.delete(&Self::key(username)).await?;

        let keys = self.storage.list(&Self::namespace_prefix(username)).await?;
        let purged = keys.len();
        for key in keys {
            self.storage.delete(&key).await?;
        }
        tracing::info!(username, purged, "account and namespace deleted");
        Ok(())
    }

    /// List all accounts, secrets projected out.
    ///
    /// # Errors
    ///
    /// Propagates storage and decode failures.
    pub async fn list_accounts(&self) -> Result<Vec<AccountProfile>, AccountError> {
        let keys = self.storage.list("accounts/").await?;
        let mut profiles = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.storage.get(&key).await? {
                profiles.push(Self::decode(&bytes)?.profile());
            }
        }
        Ok(profiles)
    }

    /// Move every key under the old owner's namespace to the new owner's.
    ///
    /// Sequential copy-then-delete per key; a crash mid-remap leaves records
    /// split across both prefixes (same accepted race as the cascade).
    async fn rename_namespace(&self, old: &str, new: &str) -> Result<(), AccountError> {
        let old_prefix = Self::namespace_prefix(old);
        let new_prefix = Self::namespace_prefix(new);

        let keys = self.storage.list(&old_prefix).await?;
        let moved = keys.len();
        for key in keys {
            if let Some(suffix) = key.strip_prefix(&old_prefix) {
                if let Some(value) = self.storage.get(&key).await? {
                    self.storage
                        .put(&format!("{new_prefix}{suffix}"), &value)
                        .await?;
                }
                self.storage.delete(&key).await?;
            }
        }
        tracing::info!(old, new, moved, "namespace remapped");
        Ok(())
    }
}

impl std::fmt::Debug for AccountDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDirectory").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credential::CredentialStore;
    use crate::folder::FolderStore;
    use crate::model::Credential;
    use passfold_storage::MemoryBackend;

    struct Fixture {
        storage: Arc<dyn StorageBackend>,
        cipher: Arc<SecretCipher>,
        directory: AccountDirectory,
    }

    fn fixture() -> Fixture {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let cipher = Arc::new(SecretCipher::new(crate::crypto::EncryptionKey::generate()));
        let directory = AccountDirectory::new(Arc::clone(&storage), Arc::clone(&cipher));
        Fixture {
            storage,
            cipher,
            directory,
        }
    }

    #[tokio::test]
    async fn bootstrap_admin_created_once() {
        let fx = fixture();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        let accounts = fx.directory.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].username, "admin");
        assert_eq!(accounts[0].role, Role::Administrator);
    }

    #[tokio::test]
    async fn admin_authenticates_with_plaintext_stored_secret() {
        let fx = fixture();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        let profile = fx.directory.authenticate("admin", "admin").await.unwrap();
        assert_eq!(profile.role, Role::Administrator);
    }

    #[tokio::test]
    async fn admin_authenticates_with_encrypted_stored_secret() {
        let fx = fixture();
        // Simulate a deployment where the admin secret was re-encrypted
        // (e.g. via a password reset).
        let account = Account {
            username: "admin".to_owned(),
            secret: fx.cipher.encrypt("admin"),
            role: Role::Administrator,
            created_at: Utc::now(),
        };
        fx.storage
            .put("accounts/admin", &serde_json::to_vec(&account).unwrap())
            .await
            .unwrap();

        let profile = fx.directory.authenticate("admin", "admin").await.unwrap();
        assert_eq!(profile.username, "admin");
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_secret() {
        let fx = fixture();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        let result = fx.directory.authenticate("admin", "wrong").await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_username() {
        let fx = fixture();
        let result = fx.directory.authenticate("ghost", "secret").await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn create_account_encrypts_secret_for_regular_users() {
        let fx = fixture();
        let profile = fx
            .directory
            .create_account("alice", "wonderland")
            .await
            .unwrap();
        assert_eq!(profile.role, Role::User);

        let raw = fx.storage.get("accounts/alice").await.unwrap().unwrap();
        let stored: Account = serde_json::from_slice(&raw).unwrap();
        assert_ne!(stored.secret, "wonderland");
        assert!(stored.secret.contains(':'));

        let authed = fx.directory.authenticate("alice", "wonderland").await;
        assert!(authed.is_ok());
    }

    #[tokio::test]
    async fn create_account_rejects_duplicates() {
        let fx = fixture();
        fx.directory.create_account("alice", "a").await.unwrap();
        let result = fx.directory.create_account("alice", "b").await;
        assert!(matches!(
            result,
            Err(AccountError::DuplicateUsername { .. })
        ));
    }

    #[tokio::test]
    async fn create_account_rejects_bad_usernames() {
        let fx = fixture();
        assert!(matches!(
            fx.directory.create_account("", "s").await,
            Err(AccountError::Validation { .. })
        ));
        assert!(matches!(
            fx.directory.create_account("a/b", "s").await,
            Err(AccountError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn update_credentials_requires_current_pair() {
        let fx = fixture();
        fx.directory.create_account("alice", "old").await.unwrap();
        let result = fx
            .directory
            .update_credentials("alice", "wrong", "alice", "new")
            .await;
        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn update_credentials_rejects_taken_username() {
        let fx = fixture();
        fx.directory.create_account("alice", "a").await.unwrap();
        fx.directory.create_account("bob", "b").await.unwrap();
        let result = fx
            .directory
            .update_credentials("alice", "a", "bob", "new")
            .await;
        assert!(matches!(
            result,
            Err(AccountError::DuplicateUsername { .. })
        ));
    }

    #[tokio::test]
    async fn update_credentials_rotates_secret() {
        let fx = fixture();
        fx.directory.create_account("alice", "old").await.unwrap();
        fx.directory
            .update_credentials("alice", "old", "alice", "new")
            .await
            .unwrap();
        assert!(fx.directory.authenticate("alice", "new").await.is_ok());
        assert!(matches!(
            fx.directory.authenticate("alice", "old").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn username_change_remaps_namespace() {
        let fx = fixture();
        fx.directory.create_account("alice", "pw").await.unwrap();

        let folders = FolderStore::new(Arc::clone(&fx.storage));
        let credentials =
            CredentialStore::new(Arc::clone(&fx.storage), Arc::clone(&fx.cipher));
        let folder = folders.create("alice", "Banking", None).await.unwrap();
        credentials
            .create(
                "alice",
                Credential {
                    id: String::new(),
                    title: "Bank".to_owned(),
                    username: "alice".to_owned(),
                    secret: "s3cr3t".to_owned(),
                    description: None,
                    folder_id: Some(folder.id.clone()),
                    owner_id: String::new(),
                },
            )
            .await
            .unwrap();

        fx.directory
            .update_credentials("alice", "pw", "alicia", "pw2")
            .await
            .unwrap();

        // Everything lives under the new owner prefix now.
        assert!(folders.list("alice").await.unwrap().is_empty());
        assert!(credentials.list("alice").await.unwrap().is_empty());
        let moved_folders = folders.list("alicia").await.unwrap();
        assert_eq!(moved_folders.len(), 1);
        assert_eq!(moved_folders[0].name, "Banking");
        let moved_credentials = credentials.list("alicia").await.unwrap();
        assert_eq!(moved_credentials.len(), 1);
        assert_eq!(moved_credentials[0].secret, "s3cr3t");

        // Old login is gone, new one works.
        assert!(matches!(
            fx.directory.authenticate("alice", "pw").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(fx.directory.authenticate("alicia", "pw2").await.is_ok());
    }

    #[tokio::test]
    async fn set_secret_always_encrypts_even_for_admin() {
        let fx = fixture();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        fx.directory.set_secret("admin", "rotated").await.unwrap();

        let raw = fx.storage.get("accounts/admin").await.unwrap().unwrap();
        let stored: Account = serde_json::from_slice(&raw).unwrap();
        assert_ne!(stored.secret, "rotated");
        // The dual check still lets the admin in with the new secret.
        assert!(fx.directory.authenticate("admin", "rotated").await.is_ok());
    }

    #[tokio::test]
    async fn set_secret_on_missing_account_fails() {
        let fx = fixture();
        let result = fx.directory.set_secret("ghost", "s").await;
        assert!(matches!(result, Err(AccountError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_account_is_forbidden_for_admin() {
        let fx = fixture();
        fx.directory.ensure_bootstrap_admin().await.unwrap();
        let result = fx.directory.delete_account("admin").await;
        assert!(matches!(result, Err(AccountError::ProtectedAccount { .. })));
    }

    #[tokio::test]
    async fn delete_account_purges_namespace() {
        let fx = fixture();
        fx.directory.create_account("alice", "pw").await.unwrap();

        let folders = FolderStore::new(Arc::clone(&fx.storage));
        folders.create("alice", "Banking", None).await.unwrap();

        fx.directory.delete_account("alice").await.unwrap();

        assert!(fx.directory.list_accounts().await.unwrap().is_empty());
        assert!(folders.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_account_fails_not_found() {
        let fx = fixture();
        let result = fx.directory.delete_account("ghost").await;
        assert!(matches!(result, Err(AccountError::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_accounts_projects_out_secrets() {
        let fx = fixture();
        fx.directory.create_account("alice", "a").await.unwrap();
        fx.directory.create_account("bob", "b").await.unwrap();
        let profiles = fx.directory.list_accounts().await.unwrap();
        assert_eq!(profiles.len(), 2);
        let json = serde_json::to_value(&profiles).unwrap();
        assert!(json[0].get("secret").is_none());
    }
}
