//! Deal document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for deals
pub const DEAL_COLLECTION: &str = "deals";

/// Partner deal stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DealDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    pub description: String,

    /// Partner offering the deal
    pub partner_name: String,

    /// Catalog category (tools, services, finance, marketing, ...)
    pub category: String,

    /// Locked deals can only be claimed by verified users
    #[serde(default)]
    pub is_locked: bool,

    /// Human-readable eligibility requirements
    pub eligibility_text: String,
}

impl DealDoc {
    /// Create a new deal document with a fresh id
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        partner_name: impl Into<String>,
        category: impl Into<String>,
        is_locked: bool,
        eligibility_text: impl Into<String>,
    ) -> Self {
        Self {
            _id: Some(ObjectId::new()),
            metadata: Metadata::new(),
            title: title.into(),
            description: description.into(),
            partner_name: partner_name.into(),
            category: category.into(),
            is_locked,
            eligibility_text: eligibility_text.into(),
        }
    }
}

impl IntoIndexes for DealDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "category": 1 },
            Some(
                IndexOptions::builder()
                    .name("category_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for DealDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
