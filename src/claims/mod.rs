//! Deal claims: authorization and recording

mod engine;
mod error;

pub use engine::{ClaimAccess, ClaimEngine, ClaimWithDeal};
pub use error::ClaimError;
