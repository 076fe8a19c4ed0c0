//! Perkhub - partner deal catalog and claim service
//!
//! Registered startups browse partner deals, sign in, and claim deals.
//! Some deals are locked behind account verification.
//!
//! ## Layout
//!
//! - **claims**: the claim authorization engine (lock gating, one claim per user and deal)
//! - **store**: credential store, deal catalog and claim store seams (MongoDB + in-memory)
//! - **auth**: JWT session tokens, session cookie, Argon2 password hashing
//! - **routes / server**: JSON HTTP API on hyper
//! - **seed**: sample catalog for development and the admin CLI

pub mod auth;
pub mod claims;
pub mod config;
pub mod db;
pub mod routes;
pub mod seed;
pub mod server;
pub mod store;
pub mod types;
pub mod validation;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{PerkhubError, Result};
