/// Authentication endpoints
///
/// This module provides the public endpoints:
/// - Tenant registration
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /api/register` - Create a tenant and its first administrator
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for an access token

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::{jwt, password},
    models::{tenant::is_valid_subdomain, user::normalize_email},
    store::NewTenant,
};
use uuid::Uuid;
use validator::Validate;

/// Message for every failed login, whatever the cause
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Administrator display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Administrator email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked with the strength policy)
    pub password: String,

    /// Organization name
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1-100 characters"))]
    pub tenant_name: String,

    /// Lowercase DNS label identifying the tenant
    pub subdomain: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub tenant_id: Uuid,

    pub user_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,

    pub tenant_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Token refresh request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,

    pub token_type: String,
}

/// Register a tenant
///
/// Creates the tenant and its first user, an ADMIN, in one step. Either both
/// exist afterwards or neither does.
///
/// # Endpoint
///
/// ```text
/// POST /api/register
/// Content-Type: application/json
///
/// {
///   "name": "Jane Doe",
///   "email": "jane@acme.test",
///   "password": "SecureP@ss123",
///   "tenantName": "Acme",
///   "subdomain": "acme"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Subdomain or email already taken
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let subdomain = req.subdomain.trim().to_lowercase();
    if !is_valid_subdomain(&subdomain) {
        return Err(ApiError::field(
            "subdomain",
            "Subdomain must be 1-63 lowercase letters, digits or hyphens",
        ));
    }

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::field("password", e))?;

    let password_hash = password::hash_password_async(req.password).await?;

    let registration = state
        .store
        .register_tenant(NewTenant {
            tenant_name: req.tenant_name.trim().to_string(),
            subdomain,
            admin_name: req.name.trim().to_string(),
            admin_email: normalize_email(&req.email),
            password_hash,
        })
        .await?;

    let tenant_id = registration.tenant.id;
    let user_id = registration.user.id;

    tracing::info!(
        tenant_id = %tenant_id,
        user_id = %user_id,
        subdomain = %registration.tenant.subdomain,
        "Tenant registered"
    );

    let tokens = jwt::issue_token_pair(user_id, tenant_id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            tenant_id,
            user_id,
            tokens,
        }),
    ))
}

/// Login endpoint
///
/// An unknown email, a wrong password and an account without a usable
/// password hash all produce the same 401 response.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed request
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = match password::verify_password_async(req.password, user.password_hash.clone()).await
    {
        Ok(valid) => valid,
        Err(password::PasswordError::InvalidHash(_)) => false,
        Err(e) => return Err(e.into()),
    };

    if !valid {
        tracing::warn!(user_id = %user.id, "Login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let tokens = jwt::issue_token_pair(user.id, user.tenant_id, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id,
        tenant_id: user.tenant_id,
        tokens,
    }))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
    }))
}
