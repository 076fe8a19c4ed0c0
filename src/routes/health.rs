//! Liveness probe: `GET /health`

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    /// "development" or "production"
    pub mode: &'static str,
    /// "mongodb" or "memory"
    pub storage: &'static str,
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            mode: if state.args.dev_mode {
                "development"
            } else {
                "production"
            },
            storage: state.storage,
        },
    )
}
