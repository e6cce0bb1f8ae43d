/// Tenant model and database operations
///
/// A tenant is an isolated customer organization. Every user and project
/// belongs to exactly one tenant, and tasks belong to a tenant through their
/// project.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tenants (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     subdomain VARCHAR(63) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The subdomain is fixed at registration; there is deliberately no update
/// operation for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Maximum subdomain length (a single DNS label)
pub const MAX_SUBDOMAIN_LEN: usize = 63;

/// Tenant model representing an organization
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Unique tenant ID
    pub id: Uuid,

    /// Organization name
    pub name: String,

    /// Unique subdomain
    pub subdomain: String,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    /// Organization name
    pub name: String,

    /// Unique subdomain (already normalized)
    pub subdomain: String,
}

/// Checks that a subdomain is a valid lowercase DNS label
///
/// Accepts 1-63 characters of `[a-z0-9-]` that neither start nor end with `-`.
///
/// # Example
///
/// ```
/// use taskdeck_shared::models::tenant::is_valid_subdomain;
///
/// assert!(is_valid_subdomain("acme"));
/// assert!(is_valid_subdomain("acme-corp-2"));
/// assert!(!is_valid_subdomain("-acme"));
/// assert!(!is_valid_subdomain("Acme"));
/// ```
pub fn is_valid_subdomain(subdomain: &str) -> bool {
    !subdomain.is_empty()
        && subdomain.len() <= MAX_SUBDOMAIN_LEN
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-')
        && subdomain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl Tenant {
    /// Creates a new tenant
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `tenants_subdomain_key` if the subdomain
    /// is already taken.
    pub async fn create<'e, E>(executor: E, data: CreateTenant) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, subdomain)
            VALUES ($1, $2)
            RETURNING id, name, subdomain, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.subdomain)
        .fetch_one(executor)
        .await?;

        Ok(tenant)
    }

    /// Checks whether a subdomain is already taken
    pub async fn subdomain_exists<'e, E>(executor: E, subdomain: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE subdomain = $1)")
                .bind(subdomain)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    /// Takes a row lock on the tenant for the rest of the transaction
    ///
    /// Role-changing operations lock their tenant first so that the admin
    /// count they read cannot change before they commit. Returns `false` if the
    /// tenant does not exist.
    pub async fn lock<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM tenants WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(locked.is_some())
    }
}
