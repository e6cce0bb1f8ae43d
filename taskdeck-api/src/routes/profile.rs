/// Self-service profile endpoints
///
/// Available to every authenticated user, for their own account only.
///
/// - `GET /api/users/me` - Own profile
/// - `PUT /api/users/me` - Change name and avatar
/// - `PUT /api/users/me/password` - Change password

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::{middleware::Principal, password},
    models::{
        nullable,
        user::{UpdateProfile, User},
    },
};
use validator::Validate;

/// Profile update request
///
/// An empty or `null` `image` removes the avatar.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub image: Option<Option<String>>,
}

impl UpdateProfileRequest {
    fn into_update(self) -> ApiResult<UpdateProfile> {
        self.validate()?;

        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ApiError::field("name", "Name cannot be empty"))
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let image = match self.image {
            None => None,
            Some(None) => Some(None),
            Some(Some(url)) if url.trim().is_empty() => Some(None),
            Some(Some(url)) if is_http_url(url.trim()) => Some(Some(url.trim().to_string())),
            Some(Some(_)) => return Err(ApiError::field("image", "Image must be an http(s) URL")),
        };

        Ok(UpdateProfile { name, image })
    }
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,

    pub confirm_new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user(&principal.scope(), principal.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let update = req.into_update()?;

    let user = state
        .store
        .update_profile(&principal.scope(), principal.user_id(), update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::debug!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: Confirmation mismatch or weak new password
/// - `401 Unauthorized`: Wrong current password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    if req.new_password != req.confirm_new_password {
        return Err(ApiError::field(
            "confirmNewPassword",
            "New passwords do not match",
        ));
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::field("newPassword", e))?;

    let scope = principal.scope();
    let user = state
        .store
        .find_user(&scope, principal.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = match password::verify_password_async(req.current_password, user.password_hash).await
    {
        Ok(valid) => valid,
        Err(password::PasswordError::InvalidHash(_)) => false,
        Err(e) => return Err(e.into()),
    };

    if !valid {
        tracing::warn!(user_id = %principal.user_id(), "Password change rejected");
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = password::hash_password_async(req.new_password).await?;

    if !state
        .store
        .update_password(&scope, principal.user_id(), password_hash)
        .await?
    {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %principal.user_id(), "Password changed");

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));

    matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}
