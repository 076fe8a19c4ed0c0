//! Persistence seams
//!
//! The claim engine and the HTTP routes talk to three stores through traits
//! so that MongoDB and the in-memory backend are interchangeable:
//!
//! - `CredentialStore`: users, credentials and the verification flag
//! - `DealCatalog`: partner deals
//! - `ClaimStore`: claims, unique per (user, deal)
//!
//! Both backends enforce uniqueness atomically at insert time and report a
//! violation as `StoreError::Duplicate`.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document, Regex};
use std::sync::Arc;

use crate::db::{ClaimDoc, DealDoc, MongoClient, UserDoc};
use crate::types::PerkhubError;

pub mod memory;
pub mod mongo;

pub use memory::{InMemoryClaimStore, InMemoryCredentialStore, InMemoryDealCatalog};
pub use mongo::{MongoClaimStore, MongoCredentialStore, MongoDealCatalog};

/// Errors reported by store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("duplicate key")]
    Duplicate,

    /// The backend failed (unreachable, timeout, malformed document)
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<PerkhubError> for StoreError {
    fn from(err: PerkhubError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Users and their credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError>;

    /// Look up a user by id
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>, StoreError>;

    /// Insert a new user; a taken email yields `StoreError::Duplicate`
    async fn create(&self, user: UserDoc) -> Result<UserDoc, StoreError>;

    /// Set the verification flag. Returns false if the user does not exist.
    async fn mark_verified(&self, id: &ObjectId) -> Result<bool, StoreError>;
}

/// Partner deal catalog
#[async_trait]
pub trait DealCatalog: Send + Sync {
    /// List deals matching the filter, newest first
    async fn list(&self, filter: &DealFilter) -> Result<Vec<DealDoc>, StoreError>;

    /// Get a deal by id
    async fn get(&self, id: &ObjectId) -> Result<Option<DealDoc>, StoreError>;

    /// Replace the whole catalog. Returns the number of deals stored.
    async fn replace_all(&self, deals: Vec<DealDoc>) -> Result<usize, StoreError>;
}

/// Claims against deals
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Find the claim for a (user, deal) pair
    async fn find_for_pair(
        &self,
        user_id: &ObjectId,
        deal_id: &ObjectId,
    ) -> Result<Option<ClaimDoc>, StoreError>;

    /// Insert a claim; an existing claim for the pair yields `StoreError::Duplicate`
    async fn create(&self, claim: ClaimDoc) -> Result<ClaimDoc, StoreError>;

    /// All claims of a user, newest first
    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<ClaimDoc>, StoreError>;
}

/// Deal listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive text match on title, description or partner name
    pub search: Option<String>,
}

impl DealFilter {
    /// Whether a deal passes the filter
    pub fn matches(&self, deal: &DealDoc) -> bool {
        if let Some(category) = &self.category {
            if &deal.category != category {
                return false;
            }
        }

        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                [&deal.title, &deal.description, &deal.partner_name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    /// MongoDB query equivalent of `matches`
    pub fn to_document(&self) -> Document {
        let mut query = Document::new();

        if let Some(category) = &self.category {
            query.insert("category", category.as_str());
        }

        if let Some(search) = &self.search {
            let pattern = Regex {
                pattern: escape_regex(search),
                options: "i".to_string(),
            };
            query.insert(
                "$or",
                vec![
                    doc! { "title": pattern.clone() },
                    doc! { "description": pattern.clone() },
                    doc! { "partner_name": pattern },
                ],
            );
        }

        query
    }
}

/// Escape regex metacharacters so search text is matched literally
pub fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The three stores, wired once at start-up
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub deals: Arc<dyn DealCatalog>,
    pub claims: Arc<dyn ClaimStore>,
}

impl Stores {
    /// In-memory stores (dev mode without MongoDB, tests)
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryCredentialStore::new()),
            deals: Arc::new(InMemoryDealCatalog::new()),
            claims: Arc::new(InMemoryClaimStore::new()),
        }
    }

    /// MongoDB-backed stores; applies collection indexes
    pub async fn mongo(client: &MongoClient) -> Result<Self, PerkhubError> {
        Ok(Self {
            users: Arc::new(MongoCredentialStore::new(client).await?),
            deals: Arc::new(MongoDealCatalog::new(client).await?),
            claims: Arc::new(MongoClaimStore::new(client).await?),
        })
    }
}
