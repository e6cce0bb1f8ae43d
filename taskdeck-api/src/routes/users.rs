/// Tenant user administration (ADMIN only)
///
/// # Endpoints
///
/// - `GET /api/users` - List the tenant's users, ordered by name
/// - `POST /api/users/invite` - Create a user with a temporary password
/// - `PUT /api/users/:id/role` - Change another user's role
/// - `DELETE /api/users/:id` - Delete another user
///
/// Role changes and deletions are checked by the store in a fixed order:
/// the caller must be an ADMIN (403), must not target their own account
/// (403), the target must exist in the tenant (404), and the tenant must keep
/// at least one ADMIN (403).

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::{authorization::require_admin, middleware::Principal, password},
    models::user::{default_name_for, normalize_email, CreateUser, User, UserRole},
    store::StoreError,
};
use uuid::Uuid;
use validator::Validate;

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub role: UserRole,

    /// Defaults to the local part of the email
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Invite response
///
/// `temporaryPassword` is shown exactly once, here.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserResponse {
    pub user: User,

    pub temporary_password: String,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<User>>> {
    require_admin(&principal)?;

    let users = state.store.list_users(&principal.scope()).await?;
    Ok(Json(users))
}

/// Invite a user into the caller's tenant
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email
/// - `403 Forbidden`: Caller is not an ADMIN
/// - `409 Conflict`: Email already used in this or another tenant
pub async fn invite_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<InviteUserRequest>,
) -> ApiResult<(StatusCode, Json<InviteUserResponse>)> {
    require_admin(&principal)?;
    req.validate()?;

    let email = normalize_email(&req.email);
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_name_for(&email));

    let temporary_password = password::generate_temporary_password();
    let password_hash = password::hash_password_async(temporary_password.clone()).await?;

    let user = state
        .store
        .invite_user(
            &principal.scope(),
            CreateUser {
                email,
                password_hash,
                name,
                role: req.role,
            },
        )
        .await?;

    tracing::info!(
        tenant_id = %principal.tenant_id(),
        user_id = %user.id,
        invited_by = %principal.user_id(),
        role = user.role.as_str(),
        "User invited"
    );

    Ok((
        StatusCode::CREATED,
        Json(InviteUserResponse {
            user,
            temporary_password,
        }),
    ))
}

/// Change another user's role
///
/// # Errors
///
/// - `403 Forbidden`: Not an ADMIN, own account, or last ADMIN
/// - `404 Not Found`: No such user in the tenant
pub async fn change_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    target: Result<ApiPath<Uuid>, ApiError>,
    body: Result<ApiJson<ChangeRoleRequest>, ApiError>,
) -> ApiResult<Json<User>> {
    // Non-admins are turned away before their input is looked at
    require_admin(&principal)?;
    let ApiPath(target_id) = target?;
    let ApiJson(req) = body?;

    let user = state
        .store
        .change_role(&principal, target_id, req.role)
        .await
        .map_err(|e| log_rejection(e, &principal, target_id, "change_role"))?;

    tracing::info!(
        tenant_id = %principal.tenant_id(),
        user_id = %user.id,
        changed_by = %principal.user_id(),
        role = user.role.as_str(),
        "User role changed"
    );

    Ok(Json(user))
}

/// Delete another user; their tasks become unassigned
///
/// # Errors
///
/// - `403 Forbidden`: Not an ADMIN, own account, or last ADMIN
/// - `404 Not Found`: No such user in the tenant
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    target: Result<ApiPath<Uuid>, ApiError>,
) -> ApiResult<StatusCode> {
    require_admin(&principal)?;
    let ApiPath(target_id) = target?;

    state
        .store
        .delete_user(&principal, target_id)
        .await
        .map_err(|e| log_rejection(e, &principal, target_id, "delete_user"))?;

    tracing::info!(
        tenant_id = %principal.tenant_id(),
        user_id = %target_id,
        deleted_by = %principal.user_id(),
        "User deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

fn log_rejection(err: StoreError, actor: &Principal, target_id: Uuid, action: &str) -> ApiError {
    if let StoreError::Rejected(reason) = &err {
        tracing::warn!(
            tenant_id = %actor.tenant_id(),
            actor_id = %actor.user_id(),
            target_id = %target_id,
            action,
            reason = %reason,
            "User administration rejected"
        );
    }

    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_role_defaults_to_member() {
        let req: InviteUserRequest =
            serde_json::from_str(r#"{"email": "new@acme.test"}"#).unwrap();
        assert_eq!(req.role, UserRole::Member);
        assert!(req.name.is_none());
    }

    #[test]
    fn test_invite_rejects_bad_email() {
        let req: InviteUserRequest =
            serde_json::from_str(r#"{"email": "not-an-email", "role": "ADMIN"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_change_role_rejects_unknown_role() {
        assert!(serde_json::from_str::<ChangeRoleRequest>(r#"{"role": "OWNER"}"#).is_err());
    }
}
