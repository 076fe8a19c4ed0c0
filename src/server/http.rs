//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection.

use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{extract_session_token, Caller, JwtValidator};
use crate::claims::ClaimEngine;
use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::store::Stores;
use crate::types::PerkhubError;

/// Storage label for MongoDB-backed stores
pub const STORAGE_MONGODB: &str = "mongodb";
/// Storage label for in-memory stores
pub const STORAGE_MEMORY: &str = "memory";

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    pub stores: Stores,
    pub claims: ClaimEngine,
    pub started_at: Instant,
    /// `STORAGE_MONGODB` or `STORAGE_MEMORY`
    pub storage: &'static str,
}

impl AppState {
    /// Wire state over already-connected stores
    pub fn new(args: Args, stores: Stores, storage: &'static str) -> Result<Self, PerkhubError> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| PerkhubError::Config("JWT_SECRET is required in production mode".into()))?;
        let jwt = JwtValidator::new(secret, args.jwt_expiry_seconds)?;
        let claims = ClaimEngine::new(&stores);

        Ok(Self {
            args,
            jwt,
            stores,
            claims,
            started_at: Instant::now(),
            storage,
        })
    }

    /// Resolve the session token in the request headers to a caller.
    ///
    /// Missing, invalid or expired tokens resolve to None.
    pub fn caller(&self, headers: &HeaderMap) -> Option<Caller> {
        extract_session_token(headers).and_then(|token| self.jwt.caller_from_token(token))
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), PerkhubError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Perkhub listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure cookies, self-verification allowed");
    } else if state.args.allow_self_verify {
        warn!("Self-verification enabled via ALLOW_SELF_VERIFY");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = routes::route(req, state).await;

    info!("[{}] {} {} -> {}", addr, method, path, response.status().as_u16());
    Ok(response)
}
