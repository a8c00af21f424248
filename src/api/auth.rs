//! Signup, login, logout and the current user.

use axum::Extension;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiJson, AppState};
use crate::auth::{self, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::types::{User, normalize_email, validate_email};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

fn cookie_headers(cookies: [String; 2]) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie).map_err(ApiError::internal)?;
        headers.append(SET_COOKIE, value);
    }
    Ok(headers)
}

/// Hash on the blocking pool.
async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)
}

fn session_response(state: &AppState, user: User, status: StatusCode) -> ApiResult<Response> {
    let session = state.auth.issue(&user)?;
    let headers = cookie_headers(state.auth.session_cookies(&session))?;
    let body = SessionResponse {
        user,
        token: session.token,
    };
    Ok((status, headers, Json(body)).into_response())
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(&required(req.email, "email")?);
    validate_email(&email)?;
    let password = required(req.password, "password")?;
    let min_len = state.auth.config().min_password_len;
    if password.chars().count() < min_len {
        return Err(ApiError::invalid_value(
            "password",
            &format!("password must be at least {} characters", min_len),
        ));
    }

    let hash = hash_password(password).await?;
    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let phone = req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    let user = state.db.create_user(&email, &hash, name, phone)?;

    info!(user_id = %user.id, email = %user.email, "User signed up");
    session_response(&state, user, StatusCode::CREATED)
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;

    let Some(user) = state.db.get_user_by_email(&email)? else {
        warn!(email = %normalize_email(&email), "Login for unknown email");
        return Err(ApiError::invalid_credentials());
    };
    if !verify_password(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::invalid_credentials());
    }

    info!(user_id = %user.id, "User logged in");
    session_response(&state, user, StatusCode::OK)
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let headers = cookie_headers(state.auth.clear_cookies())?;
    Ok((StatusCode::NO_CONTENT, headers).into_response())
}

/// `GET /auth/me`
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    state
        .db
        .get_user(&user.id)?
        .map(Json)
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
}
