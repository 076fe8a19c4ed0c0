//! In-memory store backends
//!
//! Used in dev mode when MongoDB is unavailable and as the default backend in
//! tests. Uniqueness checks and inserts happen under one write lock, so the
//! same guarantees hold as with MongoDB's unique indexes.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ClaimStore, CredentialStore, DealCatalog, DealFilter, StoreError};
use crate::db::{ClaimDoc, DealDoc, UserDoc};

fn stamp_new(metadata: &mut crate::db::Metadata) {
    let now = DateTime::now();
    metadata.is_deleted = false;
    metadata.created_at = Some(now);
    metadata.updated_at = Some(now);
}

/// Sort newest first; among equal timestamps the later insert comes first
fn newest_first<T>(mut items: Vec<(usize, T)>, created: impl Fn(&T) -> Option<DateTime>) -> Vec<T> {
    items.sort_by(|(ia, a), (ib, b)| created(b).cmp(&created(a)).then(ib.cmp(ia)));
    items.into_iter().map(|(_, item)| item).collect()
}

// =============================================================================
// Credential store
// =============================================================================

/// In-memory users keyed by id
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<ObjectId, UserDoc>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email && !u.metadata.is_deleted)
            .cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserDoc>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(id)
            .filter(|u| !u.metadata.is_deleted)
            .cloned())
    }

    async fn create(&self, mut user: UserDoc) -> Result<UserDoc, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }

        let id = *user._id.get_or_insert_with(ObjectId::new);
        if users.contains_key(&id) {
            return Err(StoreError::Duplicate);
        }

        stamp_new(&mut user.metadata);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn mark_verified(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) if !user.metadata.is_deleted => {
                user.is_verified = true;
                user.metadata.updated_at = Some(DateTime::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// =============================================================================
// Deal catalog
// =============================================================================

/// In-memory deals in insertion order
pub struct InMemoryDealCatalog {
    deals: RwLock<Vec<DealDoc>>,
}

impl InMemoryDealCatalog {
    pub fn new() -> Self {
        Self {
            deals: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryDealCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DealCatalog for InMemoryDealCatalog {
    async fn list(&self, filter: &DealFilter) -> Result<Vec<DealDoc>, StoreError> {
        let deals = self.deals.read().await;
        let matching: Vec<(usize, DealDoc)> = deals
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.metadata.is_deleted && filter.matches(d))
            .map(|(i, d)| (i, d.clone()))
            .collect();

        Ok(newest_first(matching, |d| d.metadata.created_at))
    }

    async fn get(&self, id: &ObjectId) -> Result<Option<DealDoc>, StoreError> {
        Ok(self
            .deals
            .read()
            .await
            .iter()
            .find(|d| d._id.as_ref() == Some(id) && !d.metadata.is_deleted)
            .cloned())
    }

    async fn replace_all(&self, deals: Vec<DealDoc>) -> Result<usize, StoreError> {
        let deals: Vec<DealDoc> = deals
            .into_iter()
            .map(|mut d| {
                d._id.get_or_insert_with(ObjectId::new);
                stamp_new(&mut d.metadata);
                d
            })
            .collect();
        let count = deals.len();

        *self.deals.write().await = deals;
        Ok(count)
    }
}

// =============================================================================
// Claim store
// =============================================================================

/// In-memory claims keyed by (user, deal)
pub struct InMemoryClaimStore {
    claims: RwLock<HashMap<(ObjectId, ObjectId), (usize, ClaimDoc)>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self {
            claims: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored claims
    pub async fn len(&self) -> usize {
        self.claims.read().await.len()
    }

    /// Whether no claims are stored
    pub async fn is_empty(&self) -> bool {
        self.claims.read().await.is_empty()
    }
}

impl Default for InMemoryClaimStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn find_for_pair(
        &self,
        user_id: &ObjectId,
        deal_id: &ObjectId,
    ) -> Result<Option<ClaimDoc>, StoreError> {
        Ok(self
            .claims
            .read()
            .await
            .get(&(*user_id, *deal_id))
            .map(|(_, c)| c.clone()))
    }

    async fn create(&self, mut claim: ClaimDoc) -> Result<ClaimDoc, StoreError> {
        let mut claims = self.claims.write().await;
        let key = (claim.user_id, claim.deal_id);

        if claims.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }

        claim._id.get_or_insert_with(ObjectId::new);
        stamp_new(&mut claim.metadata);
        let seq = claims.len();
        claims.insert(key, (seq, claim.clone()));
        Ok(claim)
    }

    async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<ClaimDoc>, StoreError> {
        let claims = self.claims.read().await;
        let mine: Vec<(usize, ClaimDoc)> = claims
            .values()
            .filter(|(_, c)| &c.user_id == user_id)
            .cloned()
            .collect();

        Ok(newest_first(mine, |c| c.metadata.created_at))
    }
}
