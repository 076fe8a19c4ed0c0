//! Database layer for Perkhub
//!
//! Provides MongoDB storage for users, deals, and claims.

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key, MongoClient, MongoCollection};
pub use schemas::{ClaimDoc, ClaimStatus, DealDoc, Metadata, UserDoc};
