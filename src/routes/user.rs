//! User profile route
//!
//! GET /user/me - profile of the authenticated user

use bson::doc;
use chrono::{DateTime, Utc};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{
    authenticate, json_response, method_not_allowed, BoxBody, ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    // Dev mode without MongoDB: the token is the only source of identity
    let Some(mongo) = &state.mongo else {
        return json_response(
            StatusCode::OK,
            &ProfileResponse {
                id: claims.sub,
                nickname: claims.nickname,
                created_at: None,
            },
        );
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Database error: {}", e),
                    code: Some("DB_ERROR".into()),
                },
            )
        }
    };

    match collection
        .find_one(doc! { "_id": &claims.sub, "is_active": true })
        .await
    {
        Ok(Some(user)) => json_response(
            StatusCode::OK,
            &ProfileResponse {
                id: user.id,
                nickname: user.nickname,
                created_at: Some(user.created_at.to_chrono()),
            },
        ),
        Ok(None) => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "User not found".into(),
                code: Some("NOT_FOUND".into()),
            },
        ),
        Err(e) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse {
                error: format!("Database error: {}", e),
                code: Some("DB_ERROR".into()),
            },
        ),
    }
}

/// Handle user profile HTTP requests.
///
/// Returns Some(response) if the request was handled, None if not a user
/// route.
pub async fn handle_user_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/user") {
        return None;
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::GET, "/user/me") => handle_me(req, state).await,
        (_, "/user/me") => method_not_allowed(),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "User endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
