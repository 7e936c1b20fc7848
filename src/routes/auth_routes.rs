//! HTTP routes for authentication
//!
//! - POST /auth/register - Create an account and get a token pair
//! - POST /auth/login    - Authenticate and get a token pair
//! - POST /auth/refresh  - Exchange a refresh token for a new pair
//!
//! The ledger core trusts the user id carried in the access token; these
//! routes are the boundary where that id is established.

use bson::{doc, DateTime};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    extract_token_from_header, hash_password, verify_password, JwtValidator, TokenInput, TokenKind,
};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{
    cors_preflight, get_auth_header, get_jwt_validator, json_response, parse_json_body, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserInfo,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/register
///
/// Flow:
/// 1. Validate required fields
/// 2. Check the nickname is not taken
/// 3. Hash the password with argon2
/// 4. Store the user and return a token pair
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("Invalid JSON body: {}", e),
                    code: None,
                },
            )
        }
    };

    if body.nickname.is_empty() || body.password.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Missing required fields: nickname, password".into(),
                code: None,
            },
        );
    }

    if body.password.len() < 8 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Password must be at least 8 characters".into(),
                code: Some("WEAK_PASSWORD".into()),
            },
        );
    }

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    // In dev mode without MongoDB, use simplified flow
    if state.args.dev_mode && state.mongo.is_none() {
        info!("Dev mode register (no MongoDB): {}", body.nickname);
        let user_id = Uuid::new_v4().to_string();
        return generate_auth_response(&jwt, &user_id, &body.nickname, None, StatusCode::CREATED);
    }

    let mongo = match &state.mongo {
        Some(m) => m,
        None => return db_unavailable(),
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return db_error(e),
    };

    match collection.find_one(doc! { "nickname": &body.nickname }).await {
        Ok(Some(_)) => {
            return json_response(
                StatusCode::CONFLICT,
                &ErrorResponse {
                    error: "An account with this nickname already exists".into(),
                    code: Some("USER_EXISTS".into()),
                },
            )
        }
        Ok(None) => {}
        Err(e) => return db_error(e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: format!("Failed to hash password: {}", e),
                    code: Some("HASH_ERROR".into()),
                },
            )
        }
    };

    let user = UserDoc::new(body.nickname.clone(), password_hash);
    let user_id = user.id.clone();
    let created_at = user.created_at;

    if let Err(e) = collection.insert_one(user).await {
        // Check for duplicate key error (race condition)
        let error_str = e.to_string();
        if error_str.contains("duplicate key") || error_str.contains("E11000") {
            return json_response(
                StatusCode::CONFLICT,
                &ErrorResponse {
                    error: "An account with this nickname already exists".into(),
                    code: Some("USER_EXISTS".into()),
                },
            );
        }
        return db_error(e);
    }

    info!("Registered new user: {}", body.nickname);

    generate_auth_response(
        &jwt,
        &user_id,
        &body.nickname,
        Some(created_at),
        StatusCode::CREATED,
    )
}

/// POST /auth/login
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &ErrorResponse {
                    error: format!("Invalid JSON body: {}", e),
                    code: None,
                },
            )
        }
    };

    if body.nickname.is_empty() || body.password.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "Missing required fields: nickname, password".into(),
                code: None,
            },
        );
    }

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    // In dev mode without MongoDB, accept any credentials
    if state.args.dev_mode && state.mongo.is_none() {
        info!("Dev mode login (no MongoDB): {}", body.nickname);
        let user_id = format!("dev-{}", body.nickname);
        return generate_auth_response(&jwt, &user_id, &body.nickname, None, StatusCode::OK);
    }

    let mongo = match &state.mongo {
        Some(m) => m,
        None => return db_unavailable(),
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => return db_error(e),
    };

    let user = match collection
        .find_one(doc! { "nickname": &body.nickname, "is_active": true })
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed - user not found: {}", body.nickname);
            // Use generic error to prevent user enumeration
            return invalid_credentials();
        }
        Err(e) => return db_error(e),
    };

    let password_valid = match verify_password(&body.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Password verification error: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse {
                    error: "Authentication error".into(),
                    code: Some("AUTH_ERROR".into()),
                },
            );
        }
    };

    if !password_valid {
        warn!("Login failed - invalid password: {}", body.nickname);
        return invalid_credentials();
    }

    info!("Login successful: {}", body.nickname);

    generate_auth_response(
        &jwt,
        &user.id,
        &user.nickname,
        Some(user.created_at),
        StatusCode::OK,
    )
}

/// POST /auth/refresh
///
/// Exchange a valid refresh token for a fresh token pair.
async fn handle_refresh(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let token = match extract_token_from_header(auth_header) {
        Some(t) => t,
        None => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "No token provided".into(),
                    code: None,
                },
            )
        }
    };

    let jwt = match get_jwt_validator(&state) {
        Ok(j) => j,
        Err(resp) => return resp,
    };

    let result = jwt.verify_token(token);
    let Some(claims) = result.claims else {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: result.error.unwrap_or_else(|| "Invalid token".into()),
                code: Some("INVALID_TOKEN".into()),
            },
        );
    };

    if claims.kind != TokenKind::Refresh {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: "A refresh token is required".into(),
                code: Some("INVALID_TOKEN".into()),
            },
        );
    }

    generate_auth_response(&jwt, &claims.sub, &claims.nickname, None, StatusCode::OK)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn db_unavailable() -> Response<BoxBody> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &ErrorResponse {
            error: "Database not available".into(),
            code: Some("DB_UNAVAILABLE".into()),
        },
    )
}

fn db_error(e: crate::types::LedgerError) -> Response<BoxBody> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorResponse {
            error: format!("Database error: {}", e),
            code: Some("DB_ERROR".into()),
        },
    )
}

fn invalid_credentials() -> Response<BoxBody> {
    json_response(
        StatusCode::UNAUTHORIZED,
        &ErrorResponse {
            error: "Invalid credentials".into(),
            code: Some("INVALID_CREDENTIALS".into()),
        },
    )
}

/// Generate a successful auth response with an access + refresh token pair
fn generate_auth_response(
    jwt: &JwtValidator,
    user_id: &str,
    nickname: &str,
    created_at: Option<DateTime>,
    status: StatusCode,
) -> Response<BoxBody> {
    let input = TokenInput {
        user_id: user_id.to_string(),
        nickname: nickname.to_string(),
    };

    let access = jwt.generate_token(&input);
    let refresh = jwt.generate_refresh_token(&input);

    match (access, refresh) {
        (Ok(access_token), Ok(refresh_token)) => json_response(
            status,
            &AuthResponse {
                access_token,
                refresh_token,
                user: UserInfo {
                    id: user_id.to_string(),
                    nickname: nickname.to_string(),
                    created_at: created_at.map(|d| d.to_chrono()),
                },
            },
        ),
        (Err(e), _) | (_, Err(e)) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorResponse {
                error: format!("Failed to generate token: {}", e),
                code: Some("TOKEN_ERROR".into()),
            },
        ),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        (&Method::POST, "/auth/refresh") => handle_refresh(req, state).await,

        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/refresh") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}
