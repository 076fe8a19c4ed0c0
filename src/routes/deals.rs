//! Deal catalog routes
//!
//! - `GET /api/deals?category=&search=` - list deals, newest first
//! - `GET /api/deals/{id}` - one deal plus whether the viewer can claim it

use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{claim_error_response, internal_error, json_response, BoxBody, DealView};
use crate::auth::Caller;
use crate::server::AppState;
use crate::store::DealFilter;

#[derive(Debug, Default, Deserialize)]
struct DealQuery {
    category: Option<String>,
    search: Option<String>,
}

impl DealQuery {
    fn parse(query: Option<&str>) -> Self {
        query
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default()
    }

    /// Empty parameters mean "no filter"
    fn into_filter(self) -> DealFilter {
        let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        DealFilter {
            category: keep(self.category),
            search: keep(self.search),
        }
    }
}

#[derive(Debug, Serialize)]
struct DealListResponse {
    deals: Vec<DealView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DealDetailResponse {
    deal: DealView,
    can_claim: bool,
}

pub async fn handle_list(query: Option<&str>, state: &AppState) -> Response<BoxBody> {
    let filter = DealQuery::parse(query).into_filter();

    match state.stores.deals.list(&filter).await {
        Ok(deals) => json_response(
            StatusCode::OK,
            &DealListResponse {
                deals: deals.iter().map(DealView::from).collect(),
            },
        ),
        Err(e) => {
            error!("Failed to list deals: {}", e);
            internal_error()
        }
    }
}

pub async fn handle_detail(caller: Option<Caller>, state: &AppState, deal_id: &str) -> Response<BoxBody> {
    match state.claims.evaluate(caller.as_ref(), deal_id).await {
        Ok(access) => json_response(
            StatusCode::OK,
            &DealDetailResponse {
                deal: DealView::from(&access.deal),
                can_claim: access.can_claim,
            },
        ),
        Err(e) => claim_error_response(&e),
    }
}
