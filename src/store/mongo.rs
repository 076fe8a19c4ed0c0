//! MongoDB store backends
//!
//! Thin adapters from the store traits onto typed `MongoCollection`s. Unique
//! indexes (users.email, claims.user_id+deal_id) are created with the
//! collections, and E11000 errors map to `StoreError::Duplicate`.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use tracing::{info, warn};

use super::{ClaimStore, CredentialStore, DealCatalog, DealFilter, StoreError};
use crate::db::schemas::{CLAIM_COLLECTION, DEAL_COLLECTION, USER_COLLECTION};
use crate::db::{is_duplicate_key, ClaimDoc, DealDoc, MongoClient, MongoCollection, UserDoc};
use crate::types::PerkhubError;

fn insert_error(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate
    } else {
        StoreError::Backend(format!("Insert failed: {}", err))
    }
}

/// Users collection
pub struct MongoCredentialStore {
    users: MongoCollection<UserDoc>,
}

impl MongoCredentialStore {
    pub async fn new(client: &MongoClient) -> Result<Self, PerkhubError> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": *id }).await?)
    }

    async fn create(&self, mut user: UserDoc) -> Result<UserDoc, StoreError> {
        user._id.get_or_insert_with(ObjectId::new);
        self.users.insert_one(&mut user).await.map_err(insert_error)?;
        Ok(user)
    }

    async fn mark_verified(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": *id }, doc! { "is_verified": true })
            .await?;
        Ok(result.matched_count > 0)
    }
}

/// Deals collection
pub struct MongoDealCatalog {
    deals: MongoCollection<DealDoc>,
}

impl MongoDealCatalog {
    pub async fn new(client: &MongoClient) -> Result<Self, PerkhubError> {
        Ok(Self {
            deals: client.collection(DEAL_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl DealCatalog for MongoDealCatalog {
    async fn list(&self, filter: &DealFilter) -> Result<Vec<DealDoc>, StoreError> {
        Ok(self
            .deals
            .find_many(filter.to_document(), doc! { "metadata.created_at": -1, "_id": -1 })
            .await?)
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<DealDoc>, StoreError> {
        Ok(self.deals.find_one(doc! { "_id": *id }).await?)
    }

    async fn replace_all(&self, deals: Vec<DealDoc>) -> Result<usize, StoreError> {
        let removed = self.deals.delete_many(doc! {}).await?;
        if removed > 0 {
            warn!("Removed {} existing deals before seeding", removed);
        }

        let inserted = self.deals.insert_many(deals).await?;
        info!("Inserted {} deals", inserted);
        Ok(inserted)
    }
}

/// Claims collection
pub struct MongoClaimStore {
    claims: MongoCollection<ClaimDoc>,
}

impl MongoClaimStore {
    pub async fn new(client: &MongoClient) -> Result<Self, PerkhubError> {
        Ok(Self {
            claims: client.collection(CLAIM_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl ClaimStore for MongoClaimStore {
    async fn find_for_pair(
        &self,
        user_id: &ObjectId,
        deal_id: &ObjectId,
    ) -> Result<Option<ClaimDoc>, StoreError> {
        Ok(self
            .claims
            .find_one(doc! { "user_id": *user_id, "deal_id": *deal_id })
            .await?)
    }

    async fn create(&self, mut claim: ClaimDoc) -> Result<ClaimDoc, StoreError> {
        claim._id.get_or_insert_with(ObjectId::new);
        self.claims.insert_one(&mut claim).await.map_err(insert_error)?;
        Ok(claim)
    }

    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<ClaimDoc>, StoreError> {
        Ok(self
            .claims
            .find_many(
                doc! { "user_id": *user_id },
                doc! { "metadata.created_at": -1, "_id": -1 },
            )
            .await?)
    }
}
