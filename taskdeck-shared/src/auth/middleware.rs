/// Session resolution
///
/// Turns the `Authorization: Bearer <token>` header of a request into a
/// [`Principal`]. The token only proves identity; the user is then reloaded
/// through the store, inside the token's tenant, so the principal always
/// carries the user's current role and a deleted user stops authenticating
/// immediately.
///
/// The HTTP layer wraps [`resolve_principal`] in an Axum middleware and
/// inserts the principal into request extensions:
///
/// ```no_run
/// use axum::{extract::Request, http::header, middleware::Next, response::Response};
/// use taskdeck_shared::auth::middleware::{resolve_principal, AuthError};
/// use taskdeck_shared::store::Store;
///
/// async fn session(
///     store: &dyn Store,
///     secret: &str,
///     mut req: Request,
///     next: Next,
/// ) -> Result<Response, AuthError> {
///     let header = req
///         .headers()
///         .get(header::AUTHORIZATION)
///         .and_then(|v| v.to_str().ok());
///     let principal = resolve_principal(store, secret, header).await?;
///     req.extensions_mut().insert(principal);
///     Ok(next.run(req).await)
/// }
/// ```

use serde::Serialize;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use super::tenancy::TenantScope;
use crate::models::user::{User, UserRole};
use crate::store::Store;

/// The authenticated caller of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    user_id: Uuid,
    tenant_id: Uuid,
    role: UserRole,
}

impl Principal {
    pub(crate) fn new(user_id: Uuid, tenant_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    /// Whether the current role may administer the tenant's users
    pub fn is_admin(&self) -> bool {
        self.role.can_manage_users()
    }

    /// The tenant scope this principal acts in
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant_id)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.tenant_id, user.role)
    }
}

/// Reasons a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    /// Token is valid but its user no longer exists in its tenant
    #[error("Unknown user")]
    UnknownUser,

    /// The store could not be reached while loading the user
    #[error("Session lookup failed: {0}")]
    Lookup(String),
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Resolves an `Authorization` header to a principal
///
/// # Errors
///
/// Every failure other than [`AuthError::Lookup`] means the request is
/// unauthenticated.
pub async fn resolve_principal(
    store: &dyn Store,
    secret: &str,
    authorization: Option<&str>,
) -> Result<Principal, AuthError> {
    let token = bearer_token(authorization)?;
    let claims = validate_access_token(token, secret)?;

    let scope = TenantScope::new(claims.tenant_id);
    let user = store
        .find_user(&scope, claims.sub)
        .await
        .map_err(|e| AuthError::Lookup(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(Principal::from(&user))
}
