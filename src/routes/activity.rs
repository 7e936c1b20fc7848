//! HTTP routes for activity recording and daily progress
//!
//! - POST /activity/steps   - record a step count, earn capped FitCoins
//! - POST /activity/workout - record workout minutes, earn capped FitCoins
//! - GET  /activity/today   - today's per-type totals and earnings

use chrono::{DateTime, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ledger::{ActivityType, RecordOutcome, TodaySummary, TypeProgress};
use crate::routes::{
    authenticate, error_to_response, json_response, method_not_allowed, parse_json_body, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordStepsRequest {
    pub steps: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecordWorkoutRequest {
    pub minutes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub value: u64,
    pub coins_earned: u64,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl ActivityResponse {
    fn from_outcome(outcome: &RecordOutcome) -> Self {
        Self {
            id: outcome.activity.id.clone(),
            activity_type: outcome.activity.activity_type,
            value: outcome.activity.value,
            coins_earned: outcome.granted,
            created_at: outcome.activity.recorded_at,
            message: outcome.message(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeProgressResponse {
    pub total: u64,
    pub rewards_earned: u64,
    pub rewards_max: u64,
}

impl From<&TypeProgress> for TypeProgressResponse {
    fn from(p: &TypeProgress) -> Self {
        Self {
            total: p.total,
            rewards_earned: p.rewards_earned,
            rewards_max: p.rewards_max,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TodaySummaryResponse {
    pub steps: TypeProgressResponse,
    pub workout: TypeProgressResponse,
}

impl From<&TodaySummary> for TodaySummaryResponse {
    fn from(s: &TodaySummary) -> Self {
        Self {
            steps: (&s.steps).into(),
            workout: (&s.workout).into(),
        }
    }
}

async fn handle_record(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    activity: ActivityType,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let magnitude = match activity {
        ActivityType::Steps => match parse_json_body::<RecordStepsRequest>(req).await {
            Ok(body) => body.steps,
            Err(e) => return invalid_body(e),
        },
        ActivityType::Workout => match parse_json_body::<RecordWorkoutRequest>(req).await {
            Ok(body) => body.minutes,
            Err(e) => return invalid_body(e),
        },
    };

    match state
        .recorder
        .record(&claims.sub, activity, magnitude, Utc::now())
        .await
    {
        Ok(outcome) => json_response(
            StatusCode::CREATED,
            &ActivityResponse::from_outcome(&outcome),
        ),
        Err(e) => error_to_response(e),
    }
}

fn invalid_body(err: crate::types::LedgerError) -> Response<BoxBody> {
    json_response(
        StatusCode::BAD_REQUEST,
        &ErrorResponse {
            error: format!("Invalid JSON body: {}", err),
            code: None,
        },
    )
}

async fn handle_today(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match state.aggregator.today_summary(&claims.sub, Utc::now()).await {
        Ok(summary) => json_response(StatusCode::OK, &TodaySummaryResponse::from(&summary)),
        Err(e) => error_to_response(e),
    }
}

/// Handle activity-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not an
/// activity route.
pub async fn handle_activity_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/activity") {
        return None;
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::POST, "/activity/steps") => {
            handle_record(req, state, ActivityType::Steps).await
        }
        (&Method::POST, "/activity/workout") => {
            handle_record(req, state, ActivityType::Workout).await
        }
        (&Method::GET, "/activity/today") => handle_today(req, state).await,

        (_, "/activity/steps") | (_, "/activity/workout") | (_, "/activity/today") => {
            method_not_allowed()
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Activity endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
