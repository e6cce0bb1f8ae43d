/// Role rules for user administration
///
/// TaskDeck has two tenant-level roles, ADMIN and MEMBER. Every tenant must
/// keep at least one ADMIN, and nobody may demote or delete their own account
/// through the administration endpoints. These rules are plain functions over
/// values the caller has already loaded; they never touch storage, so the
/// store can run them inside its own transaction.
///
/// Role changes and deletions apply the checks in a fixed order:
///
/// 1. [`require_admin`] on the acting principal
/// 2. [`can_act_on_self`] on the actor and target IDs
/// 3. target lookup (absent or out of tenant is `NotFound`)
/// 4. [`can_demote`] / [`can_delete`] against the tenant's admin count
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::authorization::{can_demote, AuthzError};
/// use taskdeck_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let target = Uuid::new_v4();
/// assert!(matches!(can_demote(target, UserRole::Admin, 1), Err(AuthzError::LastAdmin)));
/// assert!(can_demote(target, UserRole::Admin, 2).is_ok());
/// assert!(can_demote(target, UserRole::Member, 1).is_ok());
/// ```

use uuid::Uuid;

use super::middleware::Principal;
use crate::models::user::UserRole;

/// Rejection from a role rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The actor is not an administrator of the tenant
    #[error("Administrator role required")]
    AdminRequired,

    /// The actor targeted their own account
    #[error("You cannot perform this action on your own account")]
    SelfAction,

    /// The change would leave the tenant without an administrator
    #[error("The organization must keep at least one administrator")]
    LastAdmin,
}

/// Requires the principal to hold the ADMIN role
pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if !principal.is_admin() {
        return Err(AuthzError::AdminRequired);
    }

    Ok(())
}

/// Rejects actions whose target is the actor
pub fn can_act_on_self(actor_id: Uuid, target_id: Uuid) -> Result<(), AuthzError> {
    if actor_id == target_id {
        return Err(AuthzError::SelfAction);
    }

    Ok(())
}

/// Rejects demoting the last administrator of a tenant
///
/// `tenant_admin_count` includes the target. A count of zero can only be
/// observed with inconsistent data and is rejected the same way.
pub fn can_demote(
    target_id: Uuid,
    target_current_role: UserRole,
    tenant_admin_count: i64,
) -> Result<(), AuthzError> {
    if target_current_role == UserRole::Admin && tenant_admin_count <= 1 {
        tracing::debug!(%target_id, tenant_admin_count, "refusing to demote last admin");
        return Err(AuthzError::LastAdmin);
    }

    Ok(())
}

/// Rejects deleting the last administrator of a tenant
pub fn can_delete(
    target_id: Uuid,
    target_current_role: UserRole,
    tenant_admin_count: i64,
) -> Result<(), AuthzError> {
    if target_current_role == UserRole::Admin && tenant_admin_count <= 1 {
        tracing::debug!(%target_id, tenant_admin_count, "refusing to delete last admin");
        return Err(AuthzError::LastAdmin);
    }

    Ok(())
}

/// Checks a role change of `target` to `new_role`
///
/// Promotions and no-op changes are always allowed; only a transition away
/// from ADMIN goes through [`can_demote`].
pub fn can_change_role(
    target_id: Uuid,
    target_current_role: UserRole,
    new_role: UserRole,
    tenant_admin_count: i64,
) -> Result<(), AuthzError> {
    if new_role == UserRole::Admin {
        return Ok(());
    }

    can_demote(target_id, target_current_role, tenant_admin_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: UserRole) -> Principal {
        Principal::new(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&principal(UserRole::Admin)).is_ok());
        assert_eq!(
            require_admin(&principal(UserRole::Member)),
            Err(AuthzError::AdminRequired)
        );
    }

    #[test]
    fn test_can_act_on_self() {
        let id = Uuid::new_v4();

        assert_eq!(can_act_on_self(id, id), Err(AuthzError::SelfAction));
        assert!(can_act_on_self(id, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_last_admin_rules() {
        let target = Uuid::new_v4();

        for check in [can_demote, can_delete] {
            assert_eq!(check(target, UserRole::Admin, 1), Err(AuthzError::LastAdmin));
            assert_eq!(check(target, UserRole::Admin, 0), Err(AuthzError::LastAdmin));
            assert!(check(target, UserRole::Admin, 2).is_ok());
            assert!(check(target, UserRole::Member, 1).is_ok());
        }
    }

    #[test]
    fn test_can_change_role() {
        let target = Uuid::new_v4();

        assert!(can_change_role(target, UserRole::Member, UserRole::Admin, 1).is_ok());
        assert!(can_change_role(target, UserRole::Admin, UserRole::Admin, 1).is_ok());
        assert!(can_change_role(target, UserRole::Member, UserRole::Member, 1).is_ok());
        assert_eq!(
            can_change_role(target, UserRole::Admin, UserRole::Member, 1),
            Err(AuthzError::LastAdmin)
        );
    }

    #[test]
    fn test_authz_error_display() {
        assert!(AuthzError::LastAdmin.to_string().contains("at least one administrator"));
        assert!(AuthzError::SelfAction.to_string().contains("your own account"));
    }
}
