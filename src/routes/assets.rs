//! HTTP routes for FitCoin balances and history
//!
//! - GET /assets         - lifetime and daily earnings
//! - GET /assets/history - paginated grant history, newest first

use chrono::{DateTime, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::ledger::{ActivityType, AssetHistory, AssetSummary, RewardGrant};
use crate::routes::{
    authenticate, error_to_response, json_response, method_not_allowed, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::LedgerError;

const DEFAULT_HISTORY_LIMIT: u64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummaryResponse {
    pub total_balance: u64,
    pub total_earned: u64,
    pub earned_today: u64,
}

impl From<&AssetSummary> for AssetSummaryResponse {
    fn from(s: &AssetSummary) -> Self {
        Self {
            total_balance: s.total_balance,
            total_earned: s.total_earned,
            earned_today: s.earned_today,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemResponse {
    pub id: String,
    pub amount: u64,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<&RewardGrant> for HistoryItemResponse {
    fn from(g: &RewardGrant) -> Self {
        Self {
            id: g.id.clone(),
            amount: g.amount,
            activity_type: g.activity_type,
            reason: g.reason.clone(),
            created_at: g.granted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetHistoryResponse {
    pub items: Vec<HistoryItemResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl From<&AssetHistory> for AssetHistoryResponse {
    fn from(h: &AssetHistory) -> Self {
        Self {
            items: h.items.iter().map(Into::into).collect(),
            total: h.total,
            page: h.page,
            limit: h.limit,
        }
    }
}

/// Parse `page` and `limit` query parameters with their defaults
fn parse_paging(query: Option<&str>) -> Result<(u64, u64), LedgerError> {
    let mut page = 1u64;
    let mut limit = DEFAULT_HISTORY_LIMIT;

    if let Some(query) = query {
        for param in query.split('&') {
            if let Some((key, value)) = param.split_once('=') {
                match key {
                    "page" => {
                        page = value.parse().map_err(|_| {
                            LedgerError::InvalidInput(format!("invalid page: {}", value))
                        })?;
                    }
                    "limit" => {
                        limit = value.parse().map_err(|_| {
                            LedgerError::InvalidInput(format!("invalid limit: {}", value))
                        })?;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok((page, limit))
}

async fn handle_summary(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match state.aggregator.asset_summary(&claims.sub, Utc::now()).await {
        Ok(summary) => json_response(StatusCode::OK, &AssetSummaryResponse::from(&summary)),
        Err(e) => error_to_response(e),
    }
}

async fn handle_history(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let (page, limit) = match parse_paging(req.uri().query()) {
        Ok(p) => p,
        Err(e) => return error_to_response(e),
    };

    match state.aggregator.asset_history(&claims.sub, page, limit).await {
        Ok(history) => json_response(StatusCode::OK, &AssetHistoryResponse::from(&history)),
        Err(e) => error_to_response(e),
    }
}

/// Handle asset-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not an asset
/// route.
pub async fn handle_asset_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/assets") {
        return None;
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::GET, "/assets") => handle_summary(req, state).await,
        (&Method::GET, "/assets/history") => handle_history(req, state).await,

        (_, "/assets") | (_, "/assets/history") => method_not_allowed(),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Asset endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paging_defaults() {
        assert_eq!(parse_paging(None).unwrap(), (1, 20));
        assert_eq!(parse_paging(Some("")).unwrap(), (1, 20));
    }

    #[test]
    fn test_parse_paging_values() {
        assert_eq!(parse_paging(Some("page=2&limit=5")).unwrap(), (2, 5));
        assert_eq!(parse_paging(Some("limit=50")).unwrap(), (1, 50));
        assert_eq!(parse_paging(Some("foo=bar&page=3")).unwrap(), (3, 20));
    }

    #[test]
    fn test_parse_paging_rejects_garbage() {
        assert!(parse_paging(Some("page=abc")).is_err());
        assert!(parse_paging(Some("limit=-1")).is_err());
    }
}
