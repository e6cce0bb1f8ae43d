/// User model and database operations
///
/// Each user belongs to exactly one tenant and carries a tenant-level role.
/// Emails are globally unique and stored lowercase.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('ADMIN', 'MEMBER');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     image TEXT,
///     role user_role NOT NULL DEFAULT 'MEMBER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// All lookups other than [`User::find_by_email`] take a tenant ID. Login is
/// the only place a user is resolved before a tenant is known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Tenant-level role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Manages users and roles within the tenant
    Admin,

    /// Regular member
    Member,
}

impl UserRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Member => "MEMBER",
        }
    }

    /// Whether this role may administer other users of the tenant
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Member
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    /// Email address (lowercase, globally unique)
    pub email: String,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Avatar URL
    pub image: Option<String>,

    /// Tenant-level role
    pub role: UserRole,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Short public view used when embedding a user in other resources
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public subset of a user, embedded as a task's assignee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Input for creating a user inside an existing tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address; normalized with [`normalize_email`] before storage
    pub email: String,

    /// Already hashed password
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Initial role
    #[serde(default)]
    pub role: UserRole,
}

/// Self-service profile changes
///
/// `None` leaves a field untouched. `image: Some(None)` clears the avatar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,

    pub image: Option<Option<String>>,
}

/// Lowercases and trims an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Default display name for invited users: the local part of the email
pub fn default_name_for(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|local| !local.is_empty())
        .unwrap_or(email)
        .to_string()
}

const USER_COLUMNS: &str =
    "id, tenant_id, email, password_hash, name, image, role, created_at, updated_at";

impl User {
    /// Creates a user in the given tenant
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_email_key` if the email is taken.
    pub async fn create<'e, E>(
        executor: E,
        tenant_id: Uuid,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO users (tenant_id, email, password_hash, name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(tenant_id)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.role)
            .fetch_one(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by email across all tenants
    ///
    /// Used for login and for global email uniqueness checks.
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID with tenant isolation
    pub async fn find_in_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM users WHERE id = $1 AND tenant_id = $2",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Lists users of a tenant ordered by name
    pub async fn list_by_tenant<'e, E>(executor: E, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM users WHERE tenant_id = $1 ORDER BY name ASC, created_at ASC",
            USER_COLUMNS
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;

        Ok(users)
    }

    /// Counts the administrators of a tenant
    pub async fn count_admins<'e, E>(executor: E, tenant_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND role = 'ADMIN'")
                .bind(tenant_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    /// Sets a user's role with tenant isolation
    pub async fn update_role<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE users SET role = $3, updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2 RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(role)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Applies profile changes with tenant isolation
    ///
    /// Only fields present in `data` are written.
    pub async fn update_profile<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = sqlx::QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(image) = data.image {
            builder.push(", image = ").push_bind(image);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND tenant_id = ")
            .push_bind(tenant_id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let user = builder
            .build_query_as::<User>()
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Replaces a user's password hash with tenant isolation
    pub async fn update_password<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $3, updated_at = NOW() WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user with tenant isolation
    pub async fn delete<'e, E>(executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
