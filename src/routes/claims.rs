//! Claim routes
//!
//! - `POST /api/claims` (also `POST /api/claims/user`) - claim a deal
//! - `GET  /api/claims/user` - the caller's claims, newest first

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::fmt::Display;

use super::{
    claim_error_response, invalid_body, json_response, parse_json_body, validation_error, BoxBody,
    ClaimView,
};
use crate::auth::Caller;
use crate::claims::ClaimError;
use crate::server::AppState;
use crate::validation::ClaimRequest;

#[derive(Debug, Serialize)]
struct ClaimResponse {
    claim: ClaimView,
}

#[derive(Debug, Serialize)]
struct ClaimListResponse {
    claims: Vec<ClaimView>,
}

pub async fn handle_create<B>(req: Request<B>, state: &AppState) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    // Anonymous callers are turned away before the body is read
    let Some(caller) = state.caller(req.headers()) else {
        return claim_error_response(&ClaimError::Unauthenticated);
    };

    let body: ClaimRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return invalid_body(&e),
    };

    if let Err(details) = body.validate() {
        return validation_error(details);
    }

    match state.claims.create_claim(Some(&caller), &body.deal_id).await {
        Ok(created) => json_response(
            StatusCode::OK,
            &ClaimResponse {
                claim: ClaimView::from(&created),
            },
        ),
        Err(e) => claim_error_response(&e),
    }
}

pub async fn handle_list(caller: Option<Caller>, state: &AppState) -> Response<BoxBody> {
    match state.claims.claims_for(caller.as_ref()).await {
        Ok(claims) => json_response(
            StatusCode::OK,
            &ClaimListResponse {
                claims: claims.iter().map(ClaimView::from).collect(),
            },
        ),
        Err(e) => claim_error_response(&e),
    }
}
