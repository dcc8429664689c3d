//! Credential store: per-owner CRUD over credential records.
//!
//! Credentials are JSON documents under `vault/{owner}/credentials/{id}`.
//! The secret field is encrypted through the codec on every write and
//! decrypted on every read, so ciphertext never crosses this module's public
//! boundary in either direction.
//!
//! Two write patterns coexist:
//!
//! - per-record [`create`](CredentialStore::create) /
//!   [`update`](CredentialStore::update) / [`delete`](CredentialStore::delete),
//!   the primary pattern, keyed by id;
//! - [`bulk_replace`](CredentialStore::bulk_replace), the historical
//!   whole-collection save kept for the bulk endpoint. Last writer wins over
//!   the entire set — concurrent editors using it can lose each other's
//!   writes.

use std::sync::Arc;

use uuid::Uuid;

use passfold_storage::StorageBackend;

use crate::crypto::SecretCipher;
use crate::error::CredentialError;
use crate::model::Credential;

/// Per-owner credential storage with secret-field encryption at rest.
pub struct CredentialStore {
    storage: Arc<dyn StorageBackend>,
    cipher: Arc<SecretCipher>,
}

impl CredentialStore {
    /// Create a credential store over the given backend and codec.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, cipher: Arc<SecretCipher>) -> Self {
        Self { storage, cipher }
    }

    fn key(owner: &str, id: &str) -> String {
        format!("vault/{owner}/credentials/{id}")
    }

    fn prefix(owner: &str) -> String {
        format!("vault/{owner}/credentials/")
    }

    fn decode(bytes: &[u8]) -> Result<Credential, CredentialError> {
        serde_json::from_slice(bytes).map_err(|e| CredentialError::Serialization {
            reason: e.to_string(),
        })
    }

    fn encode(credential: &Credential) -> Result<Vec<u8>, CredentialError> {
        serde_json::to_vec(credential).map_err(|e| CredentialError::Serialization {
            reason: e.to_string(),
        })
    }

    /// List all credentials in their stored (ciphertext) form.
    async fn list_stored(&self, owner: &str) -> Result<Vec<Credential>, CredentialError> {
        let keys = self.storage.list(&Self::prefix(owner)).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.storage.get(&key).await? {
                records.push(Self::decode(&bytes)?);
            }
        }
        Ok(records)
    }

    /// Persist a credential, encrypting its secret. The caller has already
    /// fixed up id/owner.
    async fn put(&self, owner: &str, mut credential: Credential) -> Result<(), CredentialError> {
        credential.secret = self.cipher.encrypt_if_plain(&credential.secret);
        self.storage
            .put(
                &Self::key(owner, &credential.id),
                &Self::encode(&credential)?,
            )
            .await?;
        Ok(())
    }

    /// List all credentials for an owner, secrets decrypted.
    ///
    /// A record whose stored secret cannot be decrypted surfaces its raw
    /// stored value (with a logged warning) rather than failing the batch —
    /// see [`SecretCipher::decrypt_or_raw`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] or
    /// [`CredentialError::Serialization`] on backend or document failures.
    pub async fn list(&self, owner: &str) -> Result<Vec<Credential>, CredentialError> {
        let mut records = self.list_stored(owner).await?;
        for record in &mut records {
            record.secret = self.cipher.decrypt_or_raw(&record.secret);
        }
        Ok(records)
    }

    /// Fetch a single credential, secret decrypted.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if absent.
    pub async fn get(&self, owner: &str, id: &str) -> Result<Credential, CredentialError> {
        let bytes = self
            .storage
            .get(&Self::key(owner, id))
            .await?
            .ok_or_else(|| CredentialError::NotFound { id: id.to_owned() })?;
        let mut record = Self::decode(&bytes)?;
        record.secret = self.cipher.decrypt_or_raw(&record.secret);
        Ok(record)
    }

    /// Insert a single credential record, assigning an id when the caller
    /// left it empty. Returns the record as the caller handed it in (secret
    /// in plaintext), with id/owner fixed up.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] or
    /// [`CredentialError::Serialization`] on failure.
    pub async fn create(
        &self,
        owner: &str,
        mut credential: Credential,
    ) -> Result<Credential, CredentialError> {
        if credential.id.is_empty() {
            credential.id = Uuid::new_v4().to_string();
        }
        credential.owner_id = owner.to_owned();
        self.put(owner, credential.clone()).await?;
        tracing::debug!(owner, credential_id = %credential.id, "credential created");
        Ok(credential)
    }

    /// Replace an existing credential record in place.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if absent.
    pub async fn update(
        &self,
        owner: &str,
        id: &str,
        mut credential: Credential,
    ) -> Result<Credential, CredentialError> {
        if !self.storage.exists(&Self::key(owner, id)).await? {
            return Err(CredentialError::NotFound { id: id.to_owned() });
        }
        credential.id = id.to_owned();
        credential.owner_id = owner.to_owned();
        self.put(owner, credential.clone()).await?;
        Ok(credential)
    }

    /// Delete a single credential record.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if absent.
    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), CredentialError> {
        let key = Self::key(owner, id);
        if !self.storage.exists(&key).await? {
            return Err(CredentialError::NotFound { id: id.to_owned() });
        }
        self.storage.delete(&key).await?;
        Ok(())
    }

    /// Clear the owner's entire credential set and re-insert the given list,
    /// re-encrypting secrets.
    ///
    /// This is a full replace, not a diff: callers must always submit the
    /// complete desired set. Records without an id are assigned one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] or
    /// [`CredentialError::Serialization`] on failure; a mid-sequence failure
    /// leaves a partially-replaced set (the backend has no multi-key
    /// transactions).
    pub async fn bulk_replace(
        &self,
        owner: &str,
        credentials: Vec<Credential>,
    ) -> Result<(), CredentialError> {
        let existing = self.storage.list(&Self::prefix(owner)).await?;
        for key in existing {
            self.storage.delete(&key).await?;
        }
        let count = credentials.len();
        for mut credential in credentials {
            if credential.id.is_empty() {
                credential.id = Uuid::new_v4().to_string();
            }
            credential.owner_id = owner.to_owned();
            self.put(owner, credential).await?;
        }
        tracing::debug!(owner, count, "credential set replaced");
        Ok(())
    }

    /// Move a credential into a folder (`None` = the owner's root).
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if absent.
    pub async fn move_to_folder(
        &self,
        owner: &str,
        id: &str,
        folder_id: Option<&str>,
    ) -> Result<Credential, CredentialError> {
        let bytes = self
            .storage
            .get(&Self::key(owner, id))
            .await?
            .ok_or_else(|| CredentialError::NotFound { id: id.to_owned() })?;
        let mut record = Self::decode(&bytes)?;
        record.folder_id = folder_id.map(ToOwned::to_owned);
        self.storage
            .put(&Self::key(owner, id), &Self::encode(&record)?)
            .await?;
        record.secret = self.cipher.decrypt_or_raw(&record.secret);
        Ok(record)
    }

    /// Delete every credential housed directly in the given folder. Returns
    /// the number of records removed. Used by the cascading folder delete.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Storage`] or
    /// [`CredentialError::Serialization`] on failure.
    pub async fn delete_in_folder(
        &self,
        owner: &str,
        folder_id: &str,
    ) -> Result<usize, CredentialError> {
        let records = self.list_stored(owner).await?;
        let mut removed = 0;
        for record in records {
            if record.folder_id.as_deref() == Some(folder_id) {
                self.storage.delete(&Self::key(owner, &record.id)).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Read a credential's stored (ciphertext) secret, for tests and
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] if absent.
    pub async fn stored_secret(&self, owner: &str, id: &str) -> Result<String, CredentialError> {
        let bytes = self
            .storage
            .get(&Self::key(owner, id))
            .await?
            .ok_or_else(|| CredentialError::NotFound { id: id.to_owned() })?;
        Ok(Self::decode(&bytes)?.secret)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
