/// Tenant isolation guard
///
/// Every store operation on projects, tasks and users takes a [`TenantScope`].
/// A scope cannot be built from a raw ID outside this crate: it comes from an
/// authenticated [`Principal`](super::middleware::Principal) or from the store
/// when it creates a tenant. Handlers therefore have no way to query another
/// tenant's rows, even by passing a client-supplied tenant ID.

use std::fmt;

use uuid::Uuid;

/// Proof that the caller is acting within one tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    tenant_id: Uuid,
}

impl TenantScope {
    pub(crate) fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }

    /// The tenant every query under this scope filters on
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tenant_id.fmt(f)
    }
}
