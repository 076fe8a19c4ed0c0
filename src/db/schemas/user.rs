//! User document schema
//!
//! Stores credentials and the account verification flag.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// Login email, normalized to lower case
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Whether the account passed verification (unlocks locked deals)
    #[serde(default)]
    pub is_verified: bool,
}

impl UserDoc {
    /// Create a new, unverified user document with a fresh id
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            name,
            email,
            password_hash,
            is_verified: false,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
