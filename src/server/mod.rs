//! HTTP server and shared state

pub mod http;

pub use http::{run, AppState, STORAGE_MEMORY, STORAGE_MONGODB};
