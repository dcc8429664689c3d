//! Error types for `passfold-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Crypto errors never include key material or plaintext — only
//! structural descriptions of what failed to decode.

use passfold_storage::StorageError;

/// Errors from the secret codec.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The configured encryption key has the wrong length.
    #[error("invalid encryption key: expected 32 bytes (raw) or 64 hex chars, got {actual} bytes")]
    InvalidKeyLength { actual: usize },

    /// The stored value is missing the `:` envelope delimiter.
    #[error("ciphertext envelope missing delimiter")]
    MissingDelimiter,

    /// A hex segment of the envelope failed to decode.
    #[error("ciphertext hex decoding failed: {reason}")]
    InvalidHex { reason: String },

    /// The IV segment has the wrong length.
    #[error("invalid IV length: expected 16 bytes, got {actual}")]
    InvalidIvLength { actual: usize },

    /// Decryption failed (truncated ciphertext, bad padding, or wrong key).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    NotUtf8,
}

/// Errors from folder operations.
#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    /// The referenced folder does not exist for this owner.
    #[error("folder not found: {id}")]
    NotFound { id: String },

    /// The requested parent does not exist for this owner.
    #[error("invalid parent folder: {id}")]
    InvalidParent { id: String },

    /// The requested move would make a folder its own ancestor.
    #[error("moving folder {id} under {new_parent} would create a cycle")]
    CycleDetected { id: String, new_parent: String },

    /// A required field is missing or empty.
    #[error("invalid folder: {reason}")]
    Validation { reason: String },

    /// A stored folder document failed to (de)serialize.
    #[error("folder serialization failed: {reason}")]
    Serialization { reason: String },

    /// The underlying storage backend returned an error.
    #[error("folder storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The referenced credential does not exist for this owner.
    #[error("credential not found: {id}")]
    NotFound { id: String },

    /// A required field is missing or empty.
    #[error("invalid credential: {reason}")]
    Validation { reason: String },

    /// A stored credential document failed to (de)serialize.
    #[error("credential serialization failed: {reason}")]
    Serialization { reason: String },

    /// The underlying storage backend returned an error.
    #[error("credential storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the organization service.
///
/// The organizer composes the folder and credential stores, so its
/// operations surface whichever store failed.
#[derive(Debug, thiserror::Error)]
pub enum OrganizerError {
    /// A folder operation failed.
    #[error(transparent)]
    Folder(#[from] FolderError),

    /// A credential operation failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Errors from the account directory.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// No account exists with the given username.
    #[error("account not found: {username}")]
    NotFound { username: String },

    /// The username is already taken.
    #[error("username already exists: {username}")]
    DuplicateUsername { username: String },

    /// Username/secret pair did not match a stored account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The bootstrap admin account cannot be deleted.
    #[error("account '{username}' cannot be deleted")]
    ProtectedAccount { username: String },

    /// A required field is missing or malformed.
    #[error("invalid account: {reason}")]
    Validation { reason: String },

    /// A stored account document failed to (de)serialize.
    #[error("account serialization failed: {reason}")]
    Serialization { reason: String },

    /// The underlying storage backend returned an error.
    #[error("account storage error: {0}")]
    Storage(#[from] StorageError),
}
