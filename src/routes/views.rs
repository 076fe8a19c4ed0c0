//! JSON views of stored documents

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::claims::ClaimWithDeal;
use crate::db::{ClaimDoc, ClaimStatus, DealDoc, UserDoc};

fn hex_id(id: Option<bson::oid::ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_verified: bool,
}

impl From<&UserDoc> for UserView {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: hex_id(user._id),
            email: user.email.clone(),
            name: user.name.clone(),
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub partner_name: String,
    pub category: String,
    pub is_locked: bool,
    pub eligibility_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&DealDoc> for DealView {
    fn from(deal: &DealDoc) -> Self {
        Self {
            id: hex_id(deal._id),
            title: deal.title.clone(),
            description: deal.description.clone(),
            partner_name: deal.partner_name.clone(),
            category: deal.category.clone(),
            is_locked: deal.is_locked,
            eligibility_text: deal.eligibility_text.clone(),
            created_at: deal.metadata.created(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub id: String,
    pub user_id: String,
    pub deal_id: String,
    pub status: ClaimStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Joined deal; null if it has left the catalog
    pub deal: Option<DealView>,
}

impl ClaimView {
    pub fn new(claim: &ClaimDoc, deal: Option<&DealDoc>) -> Self {
        Self {
            id: hex_id(claim._id),
            user_id: claim.user_id.to_hex(),
            deal_id: claim.deal_id.to_hex(),
            status: claim.status,
            created_at: claim.metadata.created(),
            updated_at: claim.metadata.updated(),
            deal: deal.map(DealView::from),
        }
    }
}

impl From<&ClaimWithDeal> for ClaimView {
    fn from(joined: &ClaimWithDeal) -> Self {
        Self::new(&joined.claim, joined.deal.as_ref())
    }
}
