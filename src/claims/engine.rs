//! Claim authorization engine
//!
//! Decides whether a caller may claim a deal and, if so, records the claim
//! exactly once. Checks run in a fixed order and the first failure wins:
//!
//! 1. caller present, else `Unauthenticated`
//! 2. deal exists, else `DealNotFound`
//! 3. locked deal: caller record exists and is verified, else
//!    `Unauthenticated` / `VerificationRequired`
//! 4. no existing claim for (caller, deal), else `DuplicateClaim`
//! 5. insert a `pending` claim
//!
//! Nothing is written before step 5. The claim store's unique (user, deal)
//! constraint is authoritative: a duplicate reported at insert time is a
//! `DuplicateClaim`, so concurrent requests for one pair yield one claim.
//!
//! `evaluate` answers "can this viewer claim this deal?" with the same
//! admission check as steps 1-3.

use bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::ClaimError;
use crate::auth::Caller;
use crate::db::{ClaimDoc, DealDoc};
use crate::store::{ClaimStore, CredentialStore, DealCatalog, StoreError, Stores};

/// A claim joined with its deal for display
#[derive(Debug, Clone)]
pub struct ClaimWithDeal {
    pub claim: ClaimDoc,
    /// None if the deal has since been removed from the catalog
    pub deal: Option<DealDoc>,
}

/// Result of claim-access evaluation
#[derive(Debug, Clone)]
pub struct ClaimAccess {
    pub deal: DealDoc,
    pub can_claim: bool,
}

/// Claim authorization engine
#[derive(Clone)]
pub struct ClaimEngine {
    users: Arc<dyn CredentialStore>,
    deals: Arc<dyn DealCatalog>,
    claims: Arc<dyn ClaimStore>,
}

fn store_failure(step: &'static str, err: StoreError) -> ClaimError {
    error!(step, error = %err, "Claim store operation failed");
    ClaimError::StoreFailure(format!("{step}: {err}"))
}

impl ClaimEngine {
    pub fn new(stores: &Stores) -> Self {
        Self {
            users: Arc::clone(&stores.users),
            deals: Arc::clone(&stores.deals),
            claims: Arc::clone(&stores.claims),
        }
    }

    /// Create a claim on behalf of the caller
    pub async fn create_claim(
        &self,
        caller: Option<&Caller>,
        deal_id: &str,
    ) -> Result<ClaimWithDeal, ClaimError> {
        let Some(caller) = caller else {
            debug!("Claim denied: anonymous caller");
            return Err(ClaimError::Unauthenticated);
        };

        let deal = self.load_deal(deal_id).await?;
        let user_id = self.admit(Some(caller), &deal).await?;
        let deal_oid = deal._id.ok_or(ClaimError::DealNotFound)?;

        let existing = self
            .claims
            .find_for_pair(&user_id, &deal_oid)
            .await
            .map_err(|e| store_failure("find existing claim", e))?;
        if existing.is_some() {
            debug!(user = %user_id, deal = %deal_oid, "Claim denied: already claimed");
            return Err(ClaimError::DuplicateClaim);
        }

        let claim = match self.claims.create(ClaimDoc::new(user_id, deal_oid)).await {
            Ok(claim) => claim,
            Err(StoreError::Duplicate) => {
                debug!(user = %user_id, deal = %deal_oid, "Claim denied: lost insert race");
                return Err(ClaimError::DuplicateClaim);
            }
            Err(e) => return Err(store_failure("insert claim", e)),
        };

        info!(user = %user_id, deal = %deal_oid, "Claim created");

        Ok(ClaimWithDeal {
            claim,
            deal: Some(deal),
        })
    }

    /// Whether the (possibly anonymous) viewer could claim the deal
    pub async fn evaluate(
        &self,
        caller: Option<&Caller>,
        deal_id: &str,
    ) -> Result<ClaimAccess, ClaimError> {
        let deal = self.load_deal(deal_id).await?;

        let can_claim = match self.admit(caller, &deal).await {
            Ok(_) => true,
            Err(ClaimError::StoreFailure(detail)) => return Err(ClaimError::StoreFailure(detail)),
            Err(_) => false,
        };

        Ok(ClaimAccess { deal, can_claim })
    }

    /// The caller's claims, newest first, joined with their deals
    pub async fn claims_for(&self, caller: Option<&Caller>) -> Result<Vec<ClaimWithDeal>, ClaimError> {
        let caller = caller.ok_or(ClaimError::Unauthenticated)?;

        let claims = self
            .claims
            .list_for_user(&caller.user_id)
            .await
            .map_err(|e| store_failure("list claims", e))?;

        let mut deals: HashMap<ObjectId, Option<DealDoc>> = HashMap::new();
        let mut joined = Vec::with_capacity(claims.len());
        for claim in claims {
            let deal = match deals.get(&claim.deal_id) {
                Some(deal) => deal.clone(),
                None => {
                    let deal = self
                        .deals
                        .get(&claim.deal_id)
                        .await
                        .map_err(|e| store_failure("load claimed deal", e))?;
                    deals.insert(claim.deal_id, deal.clone());
                    deal
                }
            };
            joined.push(ClaimWithDeal { claim, deal });
        }

        Ok(joined)
    }

    /// Look up a deal by its hex id. Malformed ids are treated as missing.
    async fn load_deal(&self, deal_id: &str) -> Result<DealDoc, ClaimError> {
        let Ok(id) = ObjectId::parse_str(deal_id.trim()) else {
            debug!(deal_id, "Malformed deal id");
            return Err(ClaimError::DealNotFound);
        };

        self.deals
            .get(&id)
            .await
            .map_err(|e| store_failure("load deal", e))?
            .ok_or(ClaimError::DealNotFound)
    }

    /// Admission checks shared by create and evaluate (caller present, lock gate)
    async fn admit(&self, caller: Option<&Caller>, deal: &DealDoc) -> Result<ObjectId, ClaimError> {
        let caller = caller.ok_or(ClaimError::Unauthenticated)?;

        if deal.is_locked {
            let user = self
                .users
                .find_by_id(&caller.user_id)
                .await
                .map_err(|e| store_failure("load caller", e))?;

            match user {
                None => return Err(ClaimError::Unauthenticated),
                Some(user) if !user.is_verified => return Err(ClaimError::VerificationRequired),
                Some(_) => {}
            }
        }

        Ok(caller.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserDoc;
    use crate::store::{DealFilter, InMemoryClaimStore, InMemoryCredentialStore, InMemoryDealCatalog};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Claim store whose pre-check never sees the existing claim
    struct BlindClaimStore {
        inner: InMemoryClaimStore,
    }

    #[async_trait]
    impl ClaimStore for BlindClaimStore {
        async fn find_for_pair(
            &self,
            _user_id: &ObjectId,
            _deal_id: &ObjectId,
        ) -> Result<Option<ClaimDoc>, StoreError> {
            Ok(None)
        }

        async fn create(&self, claim: ClaimDoc) -> Result<ClaimDoc, StoreError> {
            self.inner.create(claim).await
        }

        async fn list_for_user(&self, user_id: &ObjectId) -> Result<Vec<ClaimDoc>, StoreError> {
            self.inner.list_for_user(user_id).await
        }
    }

    /// Claim store that is down, counting attempted writes
    #[derive(Default)]
    struct DownClaimStore {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ClaimStore for DownClaimStore {
        async fn find_for_pair(
            &self,
            _user_id: &ObjectId,
            _deal_id: &ObjectId,
        ) -> Result<Option<ClaimDoc>, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn create(&self, _claim: ClaimDoc) -> Result<ClaimDoc, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("connection refused".into()))
        }

        async fn list_for_user(&self, _user_id: &ObjectId) -> Result<Vec<ClaimDoc>, StoreError> {
            Err(StoreError::Backend("connection refused".into()))
        }
    }

    struct Fixture {
        stores: Stores,
        open_deal: String,
        locked_deal: String,
    }

    async fn fixture_with_claims(claims: Arc<dyn ClaimStore>) -> Fixture {
        let deals = Arc::new(InMemoryDealCatalog::new());
        deals
            .replace_all(vec![
                DealDoc::new("Slack Pro", "6 months", "Slack", "tools", false, "All"),
                DealDoc::new("AWS Credits", "$5,000", "AWS", "services", true, "Verified"),
            ])
            .await
            .unwrap();

        let listed = deals.list(&DealFilter::default()).await.unwrap();
        let id_of = |title: &str| {
            listed
                .iter()
                .find(|d| d.title == title)
                .and_then(|d| d._id)
                .unwrap()
                .to_hex()
        };

        Fixture {
            open_deal: id_of("Slack Pro"),
            locked_deal: id_of("AWS Credits"),
            stores: Stores {
                users: Arc::new(InMemoryCredentialStore::new()),
                deals,
                claims,
            },
        }
    }

    async fn caller(stores: &Stores, email: &str, verified: bool) -> Caller {
        let user = stores
            .users
            .create(UserDoc::new("Founder".into(), email.into(), "$argon2id$x".into()))
            .await
            .unwrap();
        let user_id = user._id.unwrap();
        if verified {
            stores.users.mark_verified(&user_id).await.unwrap();
        }
        Caller {
            user_id,
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn test_insert_time_duplicate_is_duplicate_claim() {
        let fx = fixture_with_claims(Arc::new(BlindClaimStore {
            inner: InMemoryClaimStore::new(),
        }))
        .await;
        let engine = ClaimEngine::new(&fx.stores);
        let who = caller(&fx.stores, "a@example.com", false).await;

        assert!(engine.create_claim(Some(&who), &fx.open_deal).await.is_ok());
        assert_eq!(
            engine.create_claim(Some(&who), &fx.open_deal).await.unwrap_err(),
            ClaimError::DuplicateClaim
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_store_failure_without_write() {
        let down = Arc::new(DownClaimStore::default());
        let fx = fixture_with_claims(down.clone()).await;
        let engine = ClaimEngine::new(&fx.stores);
        let who = caller(&fx.stores, "a@example.com", true).await;

        let err = engine.create_claim(Some(&who), &fx.open_deal).await.unwrap_err();
        assert!(matches!(err, ClaimError::StoreFailure(_)));
        assert_eq!(down.writes.load(Ordering::SeqCst), 0);

        let err = engine.claims_for(Some(&who)).await.unwrap_err();
        assert!(matches!(err, ClaimError::StoreFailure(_)));
    }

    #[tokio::test]
    async fn test_denials_do_not_write() {
        let store = Arc::new(InMemoryClaimStore::new());
        let fx = fixture_with_claims(store.clone()).await;
        let engine = ClaimEngine::new(&fx.stores);
        let unverified = caller(&fx.stores, "u@example.com", false).await;

        let _ = engine.create_claim(None, &fx.open_deal).await;
        let _ = engine.create_claim(Some(&unverified), &fx.locked_deal).await;
        let _ = engine
            .create_claim(Some(&unverified), &ObjectId::new().to_hex())
            .await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_caller_record_on_locked_deal() {
        let fx = fixture_with_claims(Arc::new(InMemoryClaimStore::new())).await;
        let engine = ClaimEngine::new(&fx.stores);
        let ghost = Caller {
            user_id: ObjectId::new(),
            email: "ghost@example.com".into(),
        };

        assert_eq!(
            engine.create_claim(Some(&ghost), &fx.locked_deal).await.unwrap_err(),
            ClaimError::Unauthenticated
        );
        assert!(!engine.evaluate(Some(&ghost), &fx.locked_deal).await.unwrap().can_claim);

        // Unlocked deals never consult the credential store
        assert!(engine.create_claim(Some(&ghost), &fx.open_deal).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_deal_id_is_not_found() {
        let fx = fixture_with_claims(Arc::new(InMemoryClaimStore::new())).await;
        let engine = ClaimEngine::new(&fx.stores);
        let who = caller(&fx.stores, "a@example.com", true).await;

        assert_eq!(
            engine.create_claim(Some(&who), "not-an-id").await.unwrap_err(),
            ClaimError::DealNotFound
        );
        assert_eq!(
            engine.evaluate(None, "").await.unwrap_err(),
            ClaimError::DealNotFound
        );
    }

    #[tokio::test]
    async fn test_claims_for_joins_deals_newest_first() {
        let fx = fixture_with_claims(Arc::new(InMemoryClaimStore::new())).await;
        let engine = ClaimEngine::new(&fx.stores);
        let who = caller(&fx.stores, "v@example.com", true).await;

        engine.create_claim(Some(&who), &fx.open_deal).await.unwrap();
        engine.create_claim(Some(&who), &fx.locked_deal).await.unwrap();

        let mine = engine.claims_for(Some(&who)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].deal.as_ref().unwrap().title, "AWS Credits");
        assert_eq!(mine[1].deal.as_ref().unwrap().title, "Slack Pro");

        assert_eq!(
            engine.claims_for(None).await.unwrap_err(),
            ClaimError::Unauthenticated
        );
    }
}
