//! Database schemas for Perkhub
//!
//! Defines MongoDB document structures for users, deals, and claims.

mod claim;
mod deal;
mod metadata;
mod user;

pub use claim::{ClaimDoc, ClaimStatus, CLAIM_COLLECTION};
pub use deal::{DealDoc, DEAL_COLLECTION};
pub use metadata::Metadata;
pub use user::{UserDoc, USER_COLLECTION};
