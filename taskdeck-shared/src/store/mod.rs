/// Storage abstraction
///
/// The HTTP layer talks to a [`Store`] trait object rather than to a pool, so
/// the same handlers run against PostgreSQL in production and against an
/// in-memory store in tests.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: SQLx/PostgreSQL, one transaction per operation
/// - [`memory::MemoryStore`]: `HashMap`s behind a single async mutex
///
/// # Tenant isolation
///
/// Every operation on projects, tasks and users takes a [`TenantScope`] or a
/// [`Principal`], never a raw tenant ID. Rows outside the scope behave as if
/// they did not exist.
///
/// # Role changes
///
/// [`Store::change_role`] and [`Store::delete_user`] run the whole rule
/// sequence from [`crate::auth::authorization`] (admin, self-action, lookup,
/// last-admin, mutation) as one atomic unit per tenant, so two concurrent
/// demotions can never leave a tenant without an administrator.

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::auth::middleware::Principal;
use crate::auth::tenancy::TenantScope;
use crate::models::project::{CreateProject, Project, ProjectSummary, UpdateProject};
use crate::models::task::{CreateTask, TaskDetails, TaskQuery, UpdateTask};
use crate::models::tenant::Tenant;
use crate::models::user::{CreateUser, UpdateProfile, User, UserRole};

pub mod memory;
pub mod postgres;

/// Conflict message when an invited email already belongs to the tenant
pub const EMAIL_IN_TENANT: &str = "A user with this email already exists in your organization";

/// Conflict message when an invited email belongs to another tenant
pub const EMAIL_IN_OTHER_TENANT: &str = "This email is already used by another organization";

/// Conflict message for a taken email at registration
pub const EMAIL_TAKEN: &str = "This email is already registered";

/// Conflict message for a taken subdomain
pub const SUBDOMAIN_TAKEN: &str = "This subdomain is already taken";

/// Rejection message for an assignee outside the tenant
pub const INVALID_ASSIGNEE: &str = "Invalid assignee";

/// Store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named resource does not exist in the caller's tenant
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness rule was violated
    #[error("{0}")]
    Conflict(String),

    /// The input references a row the caller may not use
    #[error("{0}")]
    InvalidReference(String),

    /// A role rule rejected the operation; nothing was written
    #[error(transparent)]
    Rejected(#[from] AuthzError),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.constraint() {
                Some("tenants_subdomain_key") => {
                    return StoreError::Conflict(SUBDOMAIN_TAKEN.to_string())
                }
                Some("users_email_key") => return StoreError::Conflict(EMAIL_TAKEN.to_string()),
                Some("tasks_assignee_id_fkey") => {
                    return StoreError::InvalidReference(INVALID_ASSIGNEE.to_string())
                }
                _ => {}
            }
        }

        StoreError::Database(err)
    }
}

/// Input for creating a tenant together with its first administrator
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub tenant_name: String,
    /// Lowercase DNS label, validated by the caller
    pub subdomain: String,
    pub admin_name: String,
    pub admin_email: String,
    pub password_hash: String,
}

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub tenant: Tenant,
    /// The tenant's first user, always an ADMIN
    pub user: User,
}

impl Registration {
    /// Scope of the newly created tenant
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant.id)
    }

    /// The new administrator as an authenticated principal
    pub fn principal(&self) -> Principal {
        Principal::from(&self.user)
    }
}

/// Persistence operations used by the API
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks connectivity to the backing storage
    async fn ping(&self) -> Result<(), StoreError>;

    /// Atomically creates a tenant and its ADMIN user
    ///
    /// Fails with `Conflict` if the subdomain or the email is taken; in that
    /// case nothing is created.
    async fn register_tenant(&self, data: NewTenant) -> Result<Registration, StoreError>;

    /// Looks a user up by email across all tenants (login only)
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Users of the tenant ordered by name
    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<User>, StoreError>;

    /// Creates a user in the tenant
    ///
    /// Fails with `Conflict` ([`EMAIL_IN_TENANT`] or [`EMAIL_IN_OTHER_TENANT`])
    /// if the email is taken.
    async fn invite_user(&self, scope: &TenantScope, data: CreateUser) -> Result<User, StoreError>;

    async fn update_profile(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError>;

    /// Replaces a password hash; returns `false` if the user is not in scope
    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: String,
    ) -> Result<bool, StoreError>;

    /// Changes another user's role in the actor's tenant
    async fn change_role(
        &self,
        actor: &Principal,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<User, StoreError>;

    /// Deletes another user of the actor's tenant, detaching their tasks
    async fn delete_user(&self, actor: &Principal, target_id: Uuid) -> Result<(), StoreError>;

    /// Projects with task counters, newest first
    async fn list_projects(&self, scope: &TenantScope) -> Result<Vec<ProjectSummary>, StoreError>;

    async fn create_project(
        &self,
        scope: &TenantScope,
        data: CreateProject,
    ) -> Result<Project, StoreError>;

    async fn find_project(&self, scope: &TenantScope, id: Uuid)
        -> Result<Option<Project>, StoreError>;

    async fn update_project(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError>;

    /// Deletes a project and its tasks; returns `false` if not in scope
    async fn delete_project(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError>;

    async fn list_tasks(
        &self,
        scope: &TenantScope,
        query: &TaskQuery,
    ) -> Result<Vec<TaskDetails>, StoreError>;

    /// Creates a task in one of the tenant's projects
    ///
    /// Fails with `NotFound("project")` if the project is not in scope and
    /// `InvalidReference` if the assignee is not a user of the tenant.
    async fn create_task(
        &self,
        scope: &TenantScope,
        data: CreateTask,
    ) -> Result<TaskDetails, StoreError>;

    async fn find_task(&self, scope: &TenantScope, id: Uuid)
        -> Result<Option<TaskDetails>, StoreError>;

    /// Applies a partial update
    ///
    /// Returns `Ok(None)` if the task is not in scope and `InvalidReference`
    /// if a new assignee is not a user of the tenant.
    async fn update_task(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError>;

    async fn delete_task(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError>;
}
