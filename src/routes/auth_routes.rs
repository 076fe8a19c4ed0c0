//! Authentication routes
//!
//! - `POST /api/auth/register` - create an account and start a session
//! - `POST /api/auth/login` - check credentials and start a session
//! - `POST /api/auth/logout` - clear the session cookie
//! - `GET  /api/auth/me` - the signed-in user
//! - `POST /api/auth/verify` - self-serve verification (dev mode or ALLOW_SELF_VERIFY)
//!
//! Sessions are JWTs in the HTTP-only `token` cookie.

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, error, info, warn};

use super::{
    error_response, internal_error, invalid_body, json_response, parse_json_body, unauthorized,
    validation_error, with_cookie, BoxBody, SuccessResponse, UserView,
};
use crate::auth::{
    clear_session_cookie, hash_password, session_cookie, verify_password, Caller, TokenInput,
};
use crate::db::UserDoc;
use crate::server::AppState;
use crate::store::StoreError;
use crate::validation::{normalize_email, LoginRequest, RegisterRequest};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

fn user_exists() -> Response<BoxBody> {
    error_response(StatusCode::BAD_REQUEST, "User already exists", "USER_EXISTS")
}

fn invalid_credentials() -> Response<BoxBody> {
    error_response(
        StatusCode::UNAUTHORIZED,
        "Invalid credentials",
        "INVALID_CREDENTIALS",
    )
}

/// `{user}` plus a fresh session cookie
fn start_session(state: &AppState, user: &UserDoc) -> Response<BoxBody> {
    let user_id = user._id.map(|id| id.to_hex()).unwrap_or_default();

    let token = match state.jwt.generate_token(TokenInput {
        user_id,
        email: user.email.clone(),
    }) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to generate token: {}", e);
            return internal_error();
        }
    };

    let cookie = session_cookie(&token, state.jwt.expiry_seconds(), state.args.secure_cookies());
    with_cookie(
        json_response(
            StatusCode::OK,
            &UserResponse {
                user: UserView::from(user),
            },
        ),
        &cookie,
    )
}

pub async fn handle_register<B>(req: Request<B>, state: &AppState) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return invalid_body(&e),
    };

    if let Err(details) = body.validate() {
        return validation_error(details);
    }

    let email = normalize_email(&body.email);

    match state.stores.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            debug!("Registration rejected: {} already exists", email);
            return user_exists();
        }
        Ok(None) => {}
        Err(e) => {
            error!("Registration lookup failed: {}", e);
            return internal_error();
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return internal_error();
        }
    };

    let user = UserDoc::new(body.name.trim().to_string(), email, password_hash);
    let user = match state.stores.users.create(user).await {
        Ok(u) => u,
        // Lost a race with a concurrent registration
        Err(StoreError::Duplicate) => return user_exists(),
        Err(e) => {
            error!("Failed to create user: {}", e);
            return internal_error();
        }
    };

    info!("Registered user {}", user.email);
    start_session(state, &user)
}

pub async fn handle_login<B>(req: Request<B>, state: &AppState) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return invalid_body(&e),
    };

    if let Err(details) = body.validate() {
        return validation_error(details);
    }

    let email = normalize_email(&body.email);

    let user = match state.stores.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            debug!("Login failed: unknown email {}", email);
            return invalid_credentials();
        }
        Err(e) => {
            error!("Login lookup failed: {}", e);
            return internal_error();
        }
    };

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            debug!("Login failed: wrong password for {}", email);
            return invalid_credentials();
        }
        Err(e) => {
            error!("Stored password hash for {} is unusable: {}", email, e);
            return internal_error();
        }
    }

    info!("User logged in: {}", user.email);
    start_session(state, &user)
}

pub fn handle_logout(state: &AppState) -> Response<BoxBody> {
    with_cookie(
        json_response(StatusCode::OK, &SuccessResponse { success: true }),
        &clear_session_cookie(state.args.secure_cookies()),
    )
}

pub async fn handle_me(caller: Option<Caller>, state: &AppState) -> Response<BoxBody> {
    let Some(caller) = caller else {
        return unauthorized();
    };

    match state.stores.users.find_by_id(&caller.user_id).await {
        Ok(Some(user)) => json_response(
            StatusCode::OK,
            &UserResponse {
                user: UserView::from(&user),
            },
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found", "USER_NOT_FOUND"),
        Err(e) => {
            error!("Failed to load user {}: {}", caller.user_id, e);
            internal_error()
        }
    }
}

/// Mark the signed-in user as verified
pub async fn handle_verify(caller: Option<Caller>, state: &AppState) -> Response<BoxBody> {
    if !state.args.self_verify_enabled() {
        return error_response(
            StatusCode::FORBIDDEN,
            "Self-verification is disabled",
            "FORBIDDEN",
        );
    }

    let Some(caller) = caller else {
        return unauthorized();
    };

    match state.stores.users.mark_verified(&caller.user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return error_response(StatusCode::NOT_FOUND, "User not found", "USER_NOT_FOUND")
        }
        Err(e) => {
            error!("Failed to verify user {}: {}", caller.user_id, e);
            return internal_error();
        }
    }

    warn!("User {} self-verified", caller.email);

    match state.stores.users.find_by_id(&caller.user_id).await {
        Ok(Some(user)) => json_response(
            StatusCode::OK,
            &UserResponse {
                user: UserView::from(&user),
            },
        ),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found", "USER_NOT_FOUND"),
        Err(e) => {
            error!("Failed to reload user {}: {}", caller.user_id, e);
            internal_error()
        }
    }
}
