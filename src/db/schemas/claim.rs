//! Claim document schema
//!
//! One claim per (user, deal) pair, enforced by a unique compound index.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for claims
pub const CLAIM_COLLECTION: &str = "claims";

/// Review status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "pending"),
            ClaimStatus::Approved => write!(f, "approved"),
            ClaimStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Claim stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClaimDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Claiming user
    pub user_id: ObjectId,

    /// Claimed deal
    pub deal_id: ObjectId,

    #[serde(default)]
    pub status: ClaimStatus,
}

impl ClaimDoc {
    /// Create a new pending claim with a fresh id
    pub fn new(user_id: ObjectId, deal_id: ObjectId) -> Self {
        Self {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            user_id,
            deal_id,
            status: ClaimStatus::Pending,
        }
    }
}

impl IntoIndexes for ClaimDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one claim per user and deal
            (
                doc! { "user_id": 1, "deal_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_deal_unique".to_string())
                        .build(),
                ),
            ),
            // Dashboard listing, newest first
            (
                doc! { "user_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ClaimDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
