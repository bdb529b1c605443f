//! Registration, login and the authenticated-profile endpoint.
//!
//! Both login failure modes return the same 401 body so a caller cannot
//! probe which emails are registered.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::auth::{AuthUser, hash_password, issue_token, verify_password};
use crate::error::{ApiError, AppJson};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            roles: user.roles,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

/// POST /api/auth/register — creates an account and signs the caller in.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let hash = hash_password(&request.password)?;
    let user = User::new(
        request.first_name,
        request.last_name,
        request.email,
        hash,
        request.phone,
    );
    let user = state.store.insert_user(user).await?;
    let token = issue_token(&user, &state.config.jwt_secret)?;

    metrics::counter!("users_registered_total").increment(1);
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login — verifies credentials and issues a token.
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    request.validate()?;

    let user = state
        .store
        .find_user_by_email(&request.email.to_lowercase())
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let valid = verify_password(&request.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = issue_token(&user, &state.config.jwt_secret)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserResponse,
}

/// GET /api/auth/me — returns the authenticated caller's profile.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}
