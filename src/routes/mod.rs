//! HTTP routes for Perkhub
//!
//! Hand-routed on `(method, path)`. Handlers are generic over the request
//! body so the router can be driven directly in tests.

pub mod auth_routes;
pub mod claims;
pub mod deals;
pub mod health;
pub mod views;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, SET_COOKIE};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error};

use crate::claims::ClaimError;
use crate::server::AppState;
use crate::types::PerkhubError;
use crate::validation::FieldError;

pub use views::{ClaimView, DealView, UserView};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Maximum accepted JSON body size
const MAX_BODY_BYTES: usize = 10240;

/// Paths served by the router, used to tell 405 from 404
const KNOWN_PATHS: &[&str] = &[
    "/health",
    "/api/auth/register",
    "/api/auth/login",
    "/api/auth/logout",
    "/api/auth/me",
    "/api/auth/verify",
    "/api/deals",
    "/api/claims",
    "/api/claims/user",
];

// =============================================================================
// Response helpers
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: &'static str,
    pub details: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

/// Attach a `Set-Cookie` header
pub fn with_cookie(mut response: Response<BoxBody>, cookie: &str) -> Response<BoxBody> {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => error!("Refusing to send malformed cookie header: {}", e),
    }
    response
}

pub fn error_response(status: StatusCode, error: impl Into<String>, code: &str) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.into(),
            code: Some(code.to_string()),
        },
    )
}

pub fn bad_request(error: impl Into<String>) -> Response<BoxBody> {
    json_response(
        StatusCode::BAD_REQUEST,
        &ErrorResponse {
            error: error.into(),
            code: None,
        },
    )
}

pub fn unauthorized() -> Response<BoxBody> {
    error_response(StatusCode::UNAUTHORIZED, "Unauthorized", "UNAUTHENTICATED")
}

/// 500 with a generic body; the cause belongs in the log
pub fn internal_error() -> Response<BoxBody> {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "INTERNAL_ERROR",
    )
}

pub fn validation_error(details: Vec<FieldError>) -> Response<BoxBody> {
    json_response(
        StatusCode::BAD_REQUEST,
        &ValidationErrorResponse {
            error: "Validation failed",
            details,
        },
    )
}

pub fn claim_error_response(err: &ClaimError) -> Response<BoxBody> {
    error_response(err.status_code(), err.to_string(), err.code())
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

fn not_found(path: &str) -> Response<BoxBody> {
    error_response(StatusCode::NOT_FOUND, format!("Not found: {}", path), "NOT_FOUND")
}

fn method_not_allowed() -> Response<BoxBody> {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method not allowed",
        "METHOD_NOT_ALLOWED",
    )
}

// =============================================================================
// Request helpers
// =============================================================================

/// Read at most `MAX_BODY_BYTES` of the body and decode it as JSON
pub async fn parse_json_body<B, T>(req: Request<B>) -> Result<T, PerkhubError>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
    T: for<'de> Deserialize<'de>,
{
    let body = req.into_body().map_err(|e| e.to_string());

    let collected = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                PerkhubError::Http("Request body too large".into())
            } else {
                PerkhubError::Http(format!("Failed to read body: {}", e))
            }
        })?;

    Ok(serde_json::from_slice(&collected.to_bytes())?)
}

/// 400 with a fixed message; the cause is only logged
pub fn invalid_body(err: &PerkhubError) -> Response<BoxBody> {
    debug!("Rejected request body: {}", err);
    bad_request("Invalid JSON body")
}

/// `/api/deals/{id}` -> `{id}`
fn deal_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix("/api/deals/")
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

// =============================================================================
// Router
// =============================================================================

/// Route a request to its handler
pub async fn route<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::GET, "/health") => health::health_check(&state),

        (&Method::POST, "/api/auth/register") => auth_routes::handle_register(req, &state).await,
        (&Method::POST, "/api/auth/login") => auth_routes::handle_login(req, &state).await,
        (&Method::POST, "/api/auth/logout") => auth_routes::handle_logout(&state),
        (&Method::GET, "/api/auth/me") => {
            let caller = state.caller(req.headers());
            auth_routes::handle_me(caller, &state).await
        }
        (&Method::POST, "/api/auth/verify") => {
            let caller = state.caller(req.headers());
            auth_routes::handle_verify(caller, &state).await
        }

        (&Method::GET, "/api/deals") => {
            let query = req.uri().query().map(str::to_owned);
            deals::handle_list(query.as_deref(), &state).await
        }

        // Both paths share the lock-aware create handler
        (&Method::POST, "/api/claims") | (&Method::POST, "/api/claims/user") => {
            claims::handle_create(req, &state).await
        }
        (&Method::GET, "/api/claims/user") => {
            let caller = state.caller(req.headers());
            claims::handle_list(caller, &state).await
        }

        (_, p) if KNOWN_PATHS.contains(&p) => {
            debug!("{} not allowed on {}", method, p);
            method_not_allowed()
        }

        (_, p) => match deal_id_from_path(p) {
            Some(id) if method == Method::GET => {
                let caller = state.caller(req.headers());
                deals::handle_detail(caller, &state, id).await
            }
            Some(_) => method_not_allowed(),
            None => not_found(p),
        },
    }
}
