/// PostgreSQL store
///
/// Every multi-statement operation runs in its own transaction; an early
/// return drops the transaction, which rolls it back. Role changes and user
/// deletion start by locking the tenant row (`SELECT ... FOR UPDATE`), which
/// serializes them per tenant: the admin count read inside the transaction
/// cannot change before the commit.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskdeck_shared::store::{postgres::PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    NewTenant, Registration, Store, StoreError, EMAIL_IN_OTHER_TENANT, EMAIL_IN_TENANT,
    EMAIL_TAKEN, INVALID_ASSIGNEE, SUBDOMAIN_TAKEN,
};
use crate::auth::authorization::{can_act_on_self, can_change_role, can_delete, require_admin};
use crate::auth::middleware::Principal;
use crate::auth::tenancy::TenantScope;
use crate::db::pool::health_check;
use crate::models::project::{CreateProject, Project, ProjectSummary, UpdateProject};
use crate::models::task::{CreateTask, Task, TaskDetails, TaskQuery, UpdateTask};
use crate::models::tenant::{CreateTenant, Tenant};
use crate::models::user::{CreateUser, UpdateProfile, User, UserRole};

/// [`Store`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn register_tenant(&self, data: NewTenant) -> Result<Registration, StoreError> {
        let mut tx = self.pool.begin().await?;

        if Tenant::subdomain_exists(&mut *tx, &data.subdomain).await? {
            return Err(StoreError::Conflict(SUBDOMAIN_TAKEN.to_string()));
        }
        if User::find_by_email(&mut *tx, &data.admin_email).await?.is_some() {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let tenant = Tenant::create(
            &mut *tx,
            CreateTenant {
                name: data.tenant_name,
                subdomain: data.subdomain,
            },
        )
        .await?;

        let user = User::create(
            &mut *tx,
            tenant.id,
            CreateUser {
                email: data.admin_email,
                password_hash: data.password_hash,
                name: data.admin_name,
                role: UserRole::Admin,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(Registration { tenant, user })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_in_tenant(&self.pool, scope.tenant_id(), id).await?)
    }

    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<User>, StoreError> {
        Ok(User::list_by_tenant(&self.pool, scope.tenant_id()).await?)
    }

    async fn invite_user(&self, scope: &TenantScope, data: CreateUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(existing) = User::find_by_email(&mut *tx, &data.email).await? {
            return Err(email_conflict(&existing, scope));
        }

        let email = data.email.clone();
        let user = match User::create(&mut *tx, scope.tenant_id(), data).await {
            Ok(user) => user,
            Err(e) => {
                let err = StoreError::from(e);
                if !matches!(&err, StoreError::Conflict(message) if message == EMAIL_TAKEN) {
                    return Err(err);
                }

                // A concurrent insert took the email after the check above
                drop(tx);
                return match User::find_by_email(&self.pool, &email).await? {
                    Some(existing) => Err(email_conflict(&existing, scope)),
                    None => Err(err),
                };
            }
        };
        tx.commit().await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        Ok(User::update_profile(&self.pool, scope.tenant_id(), id, data).await?)
    }

    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: String,
    ) -> Result<bool, StoreError> {
        Ok(User::update_password(&self.pool, scope.tenant_id(), id, &password_hash).await?)
    }

    async fn change_role(
        &self,
        actor: &Principal,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<User, StoreError> {
        require_admin(actor)?;
        can_act_on_self(actor.user_id(), target_id)?;

        let tenant_id = actor.tenant_id();
        let mut tx = self.pool.begin().await?;

        if !Tenant::lock(&mut *tx, tenant_id).await? {
            return Err(StoreError::NotFound("tenant"));
        }

        let target = User::find_in_tenant(&mut *tx, tenant_id, target_id)
            .await?
            .ok_or(StoreError::NotFound("user"))?;
        let admin_count = User::count_admins(&mut *tx, tenant_id).await?;

        can_change_role(target.id, target.role, role, admin_count)?;

        let updated = User::update_role(&mut *tx, tenant_id, target_id, role)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_user(&self, actor: &Principal, target_id: Uuid) -> Result<(), StoreError> {
        require_admin(actor)?;
        can_act_on_self(actor.user_id(), target_id)?;

        let tenant_id = actor.tenant_id();
        let mut tx = self.pool.begin().await?;

        if !Tenant::lock(&mut *tx, tenant_id).await? {
            return Err(StoreError::NotFound("tenant"));
        }

        let target = User::find_in_tenant(&mut *tx, tenant_id, target_id)
            .await?
            .ok_or(StoreError::NotFound("user"))?;
        let admin_count = User::count_admins(&mut *tx, tenant_id).await?;

        can_delete(target.id, target.role, admin_count)?;

        // tasks.assignee_id is ON DELETE SET NULL
        if !User::delete(&mut *tx, tenant_id, target_id).await? {
            return Err(StoreError::NotFound("user"));
        }

        tx.commit().await?;

        Ok(())
    }

    async fn list_projects(&self, scope: &TenantScope) -> Result<Vec<ProjectSummary>, StoreError> {
        Ok(Project::list_summaries(&self.pool, scope.tenant_id()).await?)
    }

    async fn create_project(
        &self,
        scope: &TenantScope,
        data: CreateProject,
    ) -> Result<Project, StoreError> {
        Ok(Project::create(&self.pool, scope.tenant_id(), data).await?)
    }

    async fn find_project(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_in_tenant(&self.pool, scope.tenant_id(), id).await?)
    }

    async fn update_project(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        Ok(Project::update(&self.pool, scope.tenant_id(), id, data).await?)
    }

    async fn delete_project(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError> {
        Ok(Project::delete(&self.pool, scope.tenant_id(), id).await?)
    }

    async fn list_tasks(
        &self,
        scope: &TenantScope,
        query: &TaskQuery,
    ) -> Result<Vec<TaskDetails>, StoreError> {
        Ok(Task::list_details(&self.pool, scope.tenant_id(), query).await?)
    }

    async fn create_task(
        &self,
        scope: &TenantScope,
        data: CreateTask,
    ) -> Result<TaskDetails, StoreError> {
        let tenant_id = scope.tenant_id();
        let mut tx = self.pool.begin().await?;

        if Project::find_in_tenant(&mut *tx, tenant_id, data.project_id)
            .await?
            .is_none()
        {
            return Err(StoreError::NotFound("project"));
        }

        if let Some(assignee_id) = data.assignee_id {
            if User::find_in_tenant(&mut *tx, tenant_id, assignee_id)
                .await?
                .is_none()
            {
                return Err(StoreError::InvalidReference(INVALID_ASSIGNEE.to_string()));
            }
        }

        let task = Task::create(&mut *tx, data).await?;
        let details = Task::find_details(&mut *tx, tenant_id, task.id)
            .await?
            .ok_or(StoreError::NotFound("task"))?;

        tx.commit().await?;

        Ok(details)
    }

    async fn find_task(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, StoreError> {
        Ok(Task::find_details(&self.pool, scope.tenant_id(), id).await?)
    }

    async fn update_task(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError> {
        let tenant_id = scope.tenant_id();
        let mut tx = self.pool.begin().await?;

        if Task::find_details(&mut *tx, tenant_id, id).await?.is_none() {
            return Ok(None);
        }

        if let Some(assignee_id) = data.new_assignee() {
            if User::find_in_tenant(&mut *tx, tenant_id, assignee_id)
                .await?
                .is_none()
            {
                return Err(StoreError::InvalidReference(INVALID_ASSIGNEE.to_string()));
            }
        }

        if Task::update(&mut *tx, tenant_id, id, data).await?.is_none() {
            return Ok(None);
        }
        let details = Task::find_details(&mut *tx, tenant_id, id).await?;

        tx.commit().await?;

        Ok(details)
    }

    async fn delete_task(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, scope.tenant_id(), id).await?)
    }
}

/// Conflict message for an email already owned by `existing`
fn email_conflict(existing: &User, scope: &TenantScope) -> StoreError {
    let message = if existing.tenant_id == scope.tenant_id() {
        EMAIL_IN_TENANT
    } else {
        EMAIL_IN_OTHER_TENANT
    };
    StoreError::Conflict(message.to_string())
}
