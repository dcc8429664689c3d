//! Shared data model for Passfold.
//!
//! These are the JSON documents persisted to storage and (for the most part)
//! the wire shapes returned to clients. Field names stay camelCase for
//! compatibility with data written by earlier deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored credential record.
///
/// `secret` holds the encrypted envelope at rest; the credential store
/// decrypts it on the read path, so a `Credential` handed out of the core is
/// always in plaintext form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque unique identifier, stable for the record's lifetime. Assigned
    /// by the store when a client submits an empty one.
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub username: String,
    pub secret: String,
    /// Optional free-text note.
    #[serde(default)]
    pub description: Option<String>,
    /// `None` means the record lives at the owner's root.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// The account namespace this record belongs to. Overwritten with the
    /// requesting owner on every write.
    #[serde(default)]
    pub owner_id: String,
}

/// A folder in an owner's tree.
///
/// The parent-pointer graph restricted to one owner must be a forest rooted
/// at the implicit root (`parent_id == None`); a folder can never become its
/// own ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    /// Display name; not required unique among siblings.
    pub name: String,
    /// `None` denotes root-level.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// Bumped on rename and reparent.
    pub updated_at: DateTime<Utc>,
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May manage other accounts.
    Administrator,
    User,
}

/// A stored account record. Never serialized to clients — see
/// [`AccountProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    /// Encrypted envelope, except for the bootstrap admin which may still be
    /// stored in plaintext.
    pub secret: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The client-facing projection of this account, sans secret.
    #[must_use]
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// An account with the secret projected out — the only shape that crosses
/// the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// One segment of a breadcrumb path, root first.
///
/// The implicit root segment carries `id: None` and the display name
/// `"Root"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub id: Option<String>,
    pub name: String,
}

/// A folder a credential or folder may be moved into, annotated with its
/// display path for picker UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTarget {
    /// `None` is the implicit root.
    pub id: Option<String>,
    pub name: String,
    /// Root-to-leaf display path, e.g. `Root/Banking/Personal`.
    pub full_path: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn credential_serializes_camel_case() {
        let cred = Credential {
            id: "c1".to_owned(),
            title: "Bank".to_owned(),
            username: "alice".to_owned(),
            secret: "s3cr3t".to_owned(),
            description: None,
            folder_id: Some("f1".to_owned()),
            owner_id: "alice".to_owned(),
        };
        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["folderId"], "f1");
        assert_eq!(json["ownerId"], "alice");
    }

    #[test]
    fn credential_deserializes_with_missing_optionals() {
        let json = serde_json::json!({
            "id": "c1",
            "title": "Bank",
            "username": "alice",
            "secret": "s3cr3t",
            "ownerId": "alice",
        });
        let cred: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(cred.description, None);
        assert_eq!(cred.folder_id, None);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Role::Administrator).unwrap(),
            "administrator"
        );
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "user");
    }

    #[test]
    fn profile_omits_secret() {
        let account = Account {
            username: "alice".to_owned(),
            secret: "envelope".to_owned(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(account.profile()).unwrap();
        assert!(json.get("secret").is_none());
        assert_eq!(json["username"], "alice");
    }
}
