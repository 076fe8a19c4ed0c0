//! Shared types for Perkhub

mod error;

pub use error::{PerkhubError, Result};
