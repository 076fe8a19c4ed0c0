//! HTTP API integration tests
//!
//! Requests go straight through the router with in-memory stores seeded with
//! the sample catalog, so status codes, bodies and cookies are checked
//! end-to-end without a socket.

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use perkhub::config::Args;
use perkhub::routes;
use perkhub::seed;
use perkhub::server::{AppState, STORAGE_MEMORY};
use perkhub::store::Stores;

// =============================================================================
// Helpers
// =============================================================================

async fn app(extra_args: &[&str]) -> Arc<AppState> {
    let mut argv = vec!["perkhub"];
    argv.extend_from_slice(extra_args);
    let args = Args::try_parse_from(argv).unwrap();

    let stores = Stores::in_memory();
    seed::seed_deals(stores.deals.as_ref()).await.unwrap();
    Arc::new(AppState::new(args, stores, STORAGE_MEMORY).unwrap())
}

async fn dev_app() -> Arc<AppState> {
    app(&["--dev-mode"]).await
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

async fn call(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    session: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = session {
        builder = builder.header(COOKIE, format!("token={token}"));
    }
    let payload = match body {
        Some(v) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Bytes::from(v.to_string())
        }
        None => Bytes::new(),
    };
    let req = builder.body(Full::new(payload)).unwrap();

    let response = routes::route(req, Arc::clone(state)).await;
    let status = response.status();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        cookie,
        body,
    }
}

/// `token=<jwt>; Path=/; ...` -> `<jwt>`
fn session_token(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("token="))
        .unwrap()
        .to_string()
}

async fn sign_up(state: &Arc<AppState>, email: &str) -> String {
    let reply = call(
        state,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": email, "password": "hunter22"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    session_token(&reply.cookie.unwrap())
}

async fn deal_id(state: &Arc<AppState>, title: &str) -> String {
    let reply = call(state, Method::GET, "/api/deals", None, None).await;
    reply.body["deals"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["title"] == title)
        .and_then(|d| d["id"].as_str())
        .unwrap()
        .to_string()
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let state = dev_app().await;

    let reply = call(
        &state,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "  Ada@Startup.IO ", "password": "hunter22"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["email"], "ada@startup.io");
    assert_eq!(reply.body["user"]["isVerified"], false);

    let cookie = reply.cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));
    // Dev mode runs over plain HTTP
    assert!(!cookie.contains("Secure"));

    let again = call(
        &state,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "ada@startup.io", "password": "hunter22"})),
    )
    .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["error"], "User already exists");
}

#[tokio::test]
async fn test_register_validation_details() {
    let state = dev_app().await;

    let reply = call(
        &state,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "", "email": "nope", "password": "123"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let details = reply.body["details"].as_array().unwrap();
    assert_eq!(details.len(), 3);
    assert_eq!(details[1]["field"], "email");
    assert_eq!(details[1]["message"], "Invalid email");

    let malformed = call(
        &state,
        Method::POST,
        "/api/auth/login",
        None,
        None,
    )
    .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_me_logout() {
    let state = dev_app().await;
    sign_up(&state, "grace@startup.io").await;

    let wrong = call(
        &state,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "grace@startup.io", "password": "wrong-pass"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid credentials");

    let unknown = call(
        &state,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@startup.io", "password": "hunter22"})),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let ok = call(
        &state,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "GRACE@startup.io", "password": "hunter22"})),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    let token = session_token(&ok.cookie.unwrap());

    let me = call(&state, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["name"], "Ada");

    let anonymous = call(&state, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let bad_token = call(&state, Method::GET, "/api/auth/me", Some("not.a.jwt"), None).await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);

    let logout = call(&state, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["success"], true);
    assert!(logout.cookie.unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_self_verify_disabled_in_production() {
    let state = app(&["--jwt-secret", "production-secret-with-at-least-32-chars"]).await;
    let token = sign_up(&state, "prod@startup.io").await;

    let reply = call(&state, Method::POST, "/api/auth/verify", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let state = app(&[
        "--jwt-secret",
        "production-secret-with-at-least-32-chars",
        "--allow-self-verify",
    ])
    .await;
    let token = sign_up(&state, "prod@startup.io").await;
    let reply = call(&state, Method::POST, "/api/auth/verify", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["isVerified"], true);
}

// =============================================================================
// Deals
// =============================================================================

#[tokio::test]
async fn test_list_and_filter_deals() {
    let state = dev_app().await;

    let all = call(&state, Method::GET, "/api/deals", None, None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["deals"].as_array().unwrap().len(), 6);

    let tools = call(&state, Method::GET, "/api/deals?category=tools", None, None).await;
    assert_eq!(tools.body["deals"].as_array().unwrap().len(), 3);

    let search = call(&state, Method::GET, "/api/deals?search=SLACK", None, None).await;
    let found = search.body["deals"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["partnerName"], "Slack");

    let literal = call(&state, Method::GET, "/api/deals?search=%245%2C000", None, None).await;
    assert_eq!(literal.body["deals"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deal_detail_can_claim() {
    let state = dev_app().await;
    let aws = deal_id(&state, "AWS Credits - $5,000").await;
    let notion = deal_id(&state, "50% Off Notion Pro").await;
    let token = sign_up(&state, "viewer@startup.io").await;

    let anonymous = call(&state, Method::GET, &format!("/api/deals/{notion}"), None, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.body["canClaim"], false);
    assert_eq!(anonymous.body["deal"]["title"], "50% Off Notion Pro");

    let open = call(&state, Method::GET, &format!("/api/deals/{notion}"), Some(&token), None).await;
    assert_eq!(open.body["canClaim"], true);

    let locked = call(&state, Method::GET, &format!("/api/deals/{aws}"), Some(&token), None).await;
    assert_eq!(locked.body["canClaim"], false);
    assert_eq!(locked.body["deal"]["isLocked"], true);

    let missing = call(&state, Method::GET, "/api/deals/507f1f77bcf86cd799439011", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Claims
// =============================================================================

#[tokio::test]
async fn test_claim_flow() {
    let state = dev_app().await;
    let slack = deal_id(&state, "Free Slack Pro for 6 Months").await;
    let aws = deal_id(&state, "AWS Credits - $5,000").await;

    let anonymous = call(
        &state,
        Method::POST,
        "/api/claims",
        None,
        Some(json!({"dealId": slack})),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["code"], "UNAUTHENTICATED");

    let token = sign_up(&state, "claimer@startup.io").await;

    let created = call(
        &state,
        Method::POST,
        "/api/claims",
        Some(&token),
        Some(json!({"dealId": slack})),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["claim"]["status"], "pending");
    assert_eq!(created.body["claim"]["deal"]["partnerName"], "Slack");

    let duplicate = call(
        &state,
        Method::POST,
        "/api/claims/user",
        Some(&token),
        Some(json!({"dealId": slack})),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "Deal already claimed");

    // The legacy path enforces the lock as well
    let locked = call(
        &state,
        Method::POST,
        "/api/claims/user",
        Some(&token),
        Some(json!({"dealId": aws})),
    )
    .await;
    assert_eq!(locked.status, StatusCode::FORBIDDEN);
    assert_eq!(locked.body["code"], "VERIFICATION_REQUIRED");

    let verified = call(&state, Method::POST, "/api/auth/verify", Some(&token), None).await;
    assert_eq!(verified.status, StatusCode::OK);

    let unlocked = call(
        &state,
        Method::POST,
        "/api/claims",
        Some(&token),
        Some(json!({"dealId": aws})),
    )
    .await;
    assert_eq!(unlocked.status, StatusCode::OK);

    let mine = call(&state, Method::GET, "/api/claims/user", Some(&token), None).await;
    assert_eq!(mine.status, StatusCode::OK);
    let claims = mine.body["claims"].as_array().unwrap();
    assert_eq!(claims.len(), 2);
    assert_eq!(claims[0]["deal"]["partnerName"], "Amazon Web Services");
    assert_eq!(claims[1]["deal"]["partnerName"], "Slack");

    let nobody = call(&state, Method::GET, "/api/claims/user", None, None).await;
    assert_eq!(nobody.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_claim_request_validation() {
    let state = dev_app().await;
    let token = sign_up(&state, "v@startup.io").await;

    let empty = call(
        &state,
        Method::POST,
        "/api/claims",
        Some(&token),
        Some(json!({"dealId": ""})),
    )
    .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["details"][0]["message"], "Deal ID is required");

    let bogus = call(
        &state,
        Method::POST,
        "/api/claims",
        Some(&token),
        Some(json!({"dealId": "not-an-object-id"})),
    )
    .await;
    assert_eq!(bogus.status, StatusCode::NOT_FOUND);
    assert_eq!(bogus.body["code"], "DEAL_NOT_FOUND");

    let missing = call(&state, Method::POST, "/api/claims", Some(&token), None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_anonymous_claim_rejected_before_body() {
    let state = dev_app().await;

    for body in [Some(json!({})), Some(json!({"dealId": ""})), None] {
        for path in ["/api/claims", "/api/claims/user"] {
            let reply = call(&state, Method::POST, path, None, body.clone()).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{} {:?}", path, body);
            assert_eq!(reply.body["code"], "UNAUTHENTICATED");
        }
    }
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_routing_edges() {
    let state = dev_app().await;

    let health = call(&state, Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");
    assert_eq!(health.body["storage"], "memory");

    let preflight = call(&state, Method::OPTIONS, "/api/claims", None, None).await;
    assert_eq!(preflight.status, StatusCode::NO_CONTENT);

    let wrong_method = call(&state, Method::DELETE, "/api/claims", None, None).await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);

    let unknown = call(&state, Method::GET, "/api/nope", None, None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}
