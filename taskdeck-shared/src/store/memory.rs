/// In-memory store
///
/// Keeps every table in a `HashMap` behind one `tokio::sync::Mutex`. Each
/// operation holds the lock from its first read to its last write, which gives
/// the same atomicity as a [`PgStore`](super::postgres::PgStore) transaction.
/// Used by the API test suite and for running the server without a database.
///
/// # Example
///
/// ```
/// use taskdeck_shared::store::{memory::MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let acme = store.seed_tenant("Acme", "acme", "admin@acme.test").await?;
///
/// let users = store.list_users(&acme.scope()).await?;
/// assert_eq!(users.len(), 1);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    NewTenant, Registration, Store, StoreError, EMAIL_IN_OTHER_TENANT, EMAIL_IN_TENANT,
    EMAIL_TAKEN, INVALID_ASSIGNEE, SUBDOMAIN_TAKEN,
};
use crate::auth::authorization::{can_act_on_self, can_change_role, can_delete, require_admin};
use crate::auth::middleware::Principal;
use crate::auth::tenancy::TenantScope;
use crate::models::project::{CreateProject, Project, ProjectSummary, UpdateProject};
use crate::models::task::{CreateTask, Task, TaskDetails, TaskQuery, UpdateTask};
use crate::models::tenant::Tenant;
use crate::models::user::{normalize_email, CreateUser, UpdateProfile, User, UserRole};

/// Password hash given to seeded users; no password verifies against it
pub const SEED_PASSWORD_HASH: &str = "!seeded";

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing timestamps so "newest first" is deterministic
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = normalize_email(email);
        self.users.values().find(|u| u.email == email)
    }

    fn user_in(&self, tenant_id: Uuid, id: Uuid) -> Option<&User> {
        self.users.get(&id).filter(|u| u.tenant_id == tenant_id)
    }

    fn project_in(&self, tenant_id: Uuid, id: Uuid) -> Option<&Project> {
        self.projects.get(&id).filter(|p| p.tenant_id == tenant_id)
    }

    fn task_in(&self, tenant_id: Uuid, id: Uuid) -> Option<&Task> {
        self.tasks
            .get(&id)
            .filter(|t| self.project_in(tenant_id, t.project_id).is_some())
    }

    fn admin_count(&self, tenant_id: Uuid) -> i64 {
        self.users
            .values()
            .filter(|u| u.tenant_id == tenant_id && u.role == UserRole::Admin)
            .count() as i64
    }

    fn details(&self, task: &Task) -> TaskDetails {
        TaskDetails {
            task: task.clone(),
            assignee: task
                .assignee_id
                .and_then(|id| self.users.get(&id))
                .map(User::summary),
        }
    }

    fn insert_user(&mut self, tenant_id: Uuid, data: CreateUser) -> User {
        let now = self.now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            email: normalize_email(&data.email),
            password_hash: data.password_hash,
            name: data.name,
            image: None,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        user
    }
}

/// [`Store`] kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tenant whose administrator cannot log in
    ///
    /// Fixture helper; tokens for the seeded users are minted directly.
    pub async fn seed_tenant(
        &self,
        tenant_name: &str,
        subdomain: &str,
        admin_email: &str,
    ) -> Result<Registration, StoreError> {
        self.register_tenant(NewTenant {
            tenant_name: tenant_name.to_string(),
            subdomain: subdomain.to_string(),
            admin_name: tenant_name.to_string() + " Admin",
            admin_email: admin_email.to_string(),
            password_hash: SEED_PASSWORD_HASH.to_string(),
        })
        .await
    }

    /// Adds a user with the given role to a tenant
    pub async fn seed_user(
        &self,
        scope: &TenantScope,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<User, StoreError> {
        self.invite_user(
            scope,
            CreateUser {
                email: email.to_string(),
                password_hash: SEED_PASSWORD_HASH.to_string(),
                name: name.to_string(),
                role,
            },
        )
        .await
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn register_tenant(&self, data: NewTenant) -> Result<Registration, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.tenants.values().any(|t| t.subdomain == data.subdomain) {
            return Err(StoreError::Conflict(SUBDOMAIN_TAKEN.to_string()));
        }
        if tables.user_by_email(&data.admin_email).is_some() {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: data.tenant_name,
            subdomain: data.subdomain,
            created_at: tables.now(),
        };
        tables.tenants.insert(tenant.id, tenant.clone());

        let user = tables.insert_user(
            tenant.id,
            CreateUser {
                email: data.admin_email,
                password_hash: data.password_hash,
                name: data.admin_name,
                role: UserRole::Admin,
            },
        );

        Ok(Registration { tenant, user })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.user_by_email(email).cloned())
    }

    async fn find_user(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.user_in(scope.tenant_id(), id).cloned())
    }

    async fn list_users(&self, scope: &TenantScope) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.lock().await;

        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.tenant_id == scope.tenant_id())
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));

        Ok(users)
    }

    async fn invite_user(&self, scope: &TenantScope, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.user_by_email(&data.email) {
            let message = if existing.tenant_id == scope.tenant_id() {
                EMAIL_IN_TENANT
            } else {
                EMAIL_IN_OTHER_TENANT
            };
            return Err(StoreError::Conflict(message.to_string()));
        }

        Ok(tables.insert_user(scope.tenant_id(), data))
    }

    async fn update_profile(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.user_in(scope.tenant_id(), id).is_none() {
            return Ok(None);
        }
        let now = tables.now();

        Ok(tables.users.get_mut(&id).map(|user| {
            if let Some(name) = data.name {
                user.name = name;
            }
            if let Some(image) = data.image {
                user.image = image;
            }
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: String,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.user_in(scope.tenant_id(), id).is_none() {
            return Ok(false);
        }
        let now = tables.now();

        Ok(tables
            .users
            .get_mut(&id)
            .map(|user| {
                user.password_hash = password_hash;
                user.updated_at = now;
            })
            .is_some())
    }

    async fn change_role(
        &self,
        actor: &Principal,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<User, StoreError> {
        require_admin(actor)?;
        can_act_on_self(actor.user_id(), target_id)?;

        let mut tables = self.tables.lock().await;
        let tenant_id = actor.tenant_id();

        let target = tables
            .user_in(tenant_id, target_id)
            .ok_or(StoreError::NotFound("user"))?;
        can_change_role(target.id, target.role, role, tables.admin_count(tenant_id))?;

        let now = tables.now();
        let user = tables
            .users
            .get_mut(&target_id)
            .ok_or(StoreError::NotFound("user"))?;
        user.role = role;
        user.updated_at = now;

        Ok(user.clone())
    }

    async fn delete_user(&self, actor: &Principal, target_id: Uuid) -> Result<(), StoreError> {
        require_admin(actor)?;
        can_act_on_self(actor.user_id(), target_id)?;

        let mut tables = self.tables.lock().await;
        let tenant_id = actor.tenant_id();

        let target = tables
            .user_in(tenant_id, target_id)
            .ok_or(StoreError::NotFound("user"))?;
        can_delete(target.id, target.role, tables.admin_count(tenant_id))?;

        tables.users.remove(&target_id);
        for task in tables.tasks.values_mut() {
            if task.assignee_id == Some(target_id) {
                task.assignee_id = None;
            }
        }

        Ok(())
    }

    async fn list_projects(&self, scope: &TenantScope) -> Result<Vec<ProjectSummary>, StoreError> {
        let tables = self.tables.lock().await;

        let mut projects: Vec<ProjectSummary> = tables
            .projects
            .values()
            .filter(|p| p.tenant_id == scope.tenant_id())
            .map(|project| {
                let tasks = tables.tasks.values().filter(|t| t.project_id == project.id);
                let (total, completed) = tasks.fold((0, 0), |(total, completed), t| {
                    (total + 1, completed + i64::from(t.status.is_completed()))
                });

                ProjectSummary {
                    project: project.clone(),
                    total_tasks: total,
                    completed_tasks: completed,
                }
            })
            .collect();
        projects.sort_by(|a, b| {
            b.project
                .created_at
                .cmp(&a.project.created_at)
                .then(a.project.id.cmp(&b.project.id))
        });

        Ok(projects)
    }

    async fn create_project(
        &self,
        scope: &TenantScope,
        data: CreateProject,
    ) -> Result<Project, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = tables.now();

        let project = Project {
            id: Uuid::new_v4(),
            tenant_id: scope.tenant_id(),
            name: data.name,
            description: data.description,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());

        Ok(project)
    }

    async fn find_project(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<Project>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.project_in(scope.tenant_id(), id).cloned())
    }

    async fn update_project(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.project_in(scope.tenant_id(), id).is_none() {
            return Ok(None);
        }
        let now = tables.now();

        Ok(tables.projects.get_mut(&id).map(|project| {
            project.name = data.name;
            project.description = data.description;
            project.updated_at = now;
            project.clone()
        }))
    }

    async fn delete_project(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.project_in(scope.tenant_id(), id).is_none() {
            return Ok(false);
        }

        tables.projects.remove(&id);
        tables.tasks.retain(|_, task| task.project_id != id);

        Ok(true)
    }

    async fn list_tasks(
        &self,
        scope: &TenantScope,
        query: &TaskQuery,
    ) -> Result<Vec<TaskDetails>, StoreError> {
        let tables = self.tables.lock().await;

        let mut tasks: Vec<&Task> = tables
            .tasks
            .values()
            .filter(|t| tables.project_in(scope.tenant_id(), t.project_id).is_some())
            .filter(|t| query.matches(t))
            .collect();
        tasks.sort_by(|a, b| query.sort.compare(a, b));

        Ok(tasks.into_iter().map(|t| tables.details(t)).collect())
    }

    async fn create_task(
        &self,
        scope: &TenantScope,
        data: CreateTask,
    ) -> Result<TaskDetails, StoreError> {
        let mut tables = self.tables.lock().await;
        let tenant_id = scope.tenant_id();

        if tables.project_in(tenant_id, data.project_id).is_none() {
            return Err(StoreError::NotFound("project"));
        }
        if let Some(assignee_id) = data.assignee_id {
            if tables.user_in(tenant_id, assignee_id).is_none() {
                return Err(StoreError::InvalidReference(INVALID_ASSIGNEE.to_string()));
            }
        }

        let now = tables.now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            status: data.status.unwrap_or_default(),
            priority: data.priority.unwrap_or_default(),
            assignee_id: data.assignee_id,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());

        Ok(tables.details(&task))
    }

    async fn find_task(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.task_in(scope.tenant_id(), id).map(|t| tables.details(t)))
    }

    async fn update_task(
        &self,
        scope: &TenantScope,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<TaskDetails>, StoreError> {
        let mut tables = self.tables.lock().await;
        let tenant_id = scope.tenant_id();

        if tables.task_in(tenant_id, id).is_none() {
            return Ok(None);
        }
        if let Some(assignee_id) = data.new_assignee() {
            if tables.user_in(tenant_id, assignee_id).is_none() {
                return Err(StoreError::InvalidReference(INVALID_ASSIGNEE.to_string()));
            }
        }

        let now = tables.now();
        let updated = match tables.tasks.get_mut(&id) {
            Some(task) => {
                data.apply_to(task);
                task.updated_at = now;
                task.clone()
            }
            None => return Ok(None),
        };

        Ok(Some(tables.details(&updated)))
    }

    async fn delete_task(&self, scope: &TenantScope, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.task_in(scope.tenant_id(), id).is_none() {
            return Ok(false);
        }

        Ok(tables.tasks.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::authorization::AuthzError;
    use crate::models::task::{TaskPriority, TaskSort, TaskStatus};

    async fn acme() -> (MemoryStore, Registration) {
        let store = MemoryStore::new();
        let registration = store
            .seed_tenant("Acme", "acme", "admin@acme.test")
            .await
            .unwrap();
        (store, registration)
    }

    async fn project(store: &MemoryStore, scope: &TenantScope, name: &str) -> Project {
        store
            .create_project(
                scope,
                CreateProject {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
    }

    async fn task(store: &MemoryStore, scope: &TenantScope, project_id: Uuid, title: &str) -> TaskDetails {
        store
            .create_task(
                scope,
                CreateTask {
                    project_id,
                    title: title.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let (store, _) = acme().await;

        let same_subdomain = store.seed_tenant("Other", "acme", "other@acme.test").await;
        assert!(matches!(same_subdomain, Err(StoreError::Conflict(m)) if m == SUBDOMAIN_TAKEN));

        let same_email = store.seed_tenant("Other", "other", "ADMIN@acme.test").await;
        assert!(matches!(same_email, Err(StoreError::Conflict(m)) if m == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn test_invite_conflicts_are_distinguished() {
        let (store, acme) = acme().await;
        let globex = store
            .seed_tenant("Globex", "globex", "admin@globex.test")
            .await
            .unwrap();

        let same_tenant = store
            .seed_user(&acme.scope(), "Dup", "admin@acme.test", UserRole::Member)
            .await;
        assert!(matches!(same_tenant, Err(StoreError::Conflict(m)) if m == EMAIL_IN_TENANT));

        let other_tenant = store
            .seed_user(&acme.scope(), "Dup", "admin@globex.test", UserRole::Member)
            .await;
        assert!(matches!(other_tenant, Err(StoreError::Conflict(m)) if m == EMAIL_IN_OTHER_TENANT));

        assert_eq!(store.list_users(&globex.scope()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_change_order_of_checks() {
        let (store, acme) = acme().await;
        let admin = acme.principal();
        let member = store
            .seed_user(&acme.scope(), "Mia", "mia@acme.test", UserRole::Member)
            .await
            .unwrap();
        let member_principal = Principal::from(&member);

        // Non-admin is rejected before anything else, even on a missing target.
        let err = store
            .change_role(&member_principal, Uuid::new_v4(), UserRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(AuthzError::AdminRequired)));

        // Self-action fires before the last-admin rule.
        let err = store
            .change_role(&admin, admin.user_id(), UserRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(AuthzError::SelfAction)));

        let err = store
            .change_role(&admin, Uuid::new_v4(), UserRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));

        let promoted = store
            .change_role(&admin, member.id, UserRole::Admin)
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_demoted_by_other_admin() {
        let (store, acme) = acme().await;
        let first = acme.principal();
        let second = store
            .seed_user(&acme.scope(), "Sam", "sam@acme.test", UserRole::Admin)
            .await
            .unwrap();
        let second_principal = Principal::from(&second);

        // Two admins: demoting one is fine.
        store
            .change_role(&second_principal, first.user_id(), UserRole::Member)
            .await
            .unwrap();

        // The demoted user is no longer an admin, so re-load them as actor.
        let first_now = store
            .find_user(&acme.scope(), first.user_id())
            .await
            .unwrap()
            .unwrap();
        let err = store
            .change_role(&Principal::from(&first_now), second.id, UserRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(AuthzError::AdminRequired)));

        // A stale principal that still claims ADMIN hits the last-admin rule.
        let err = store
            .change_role(&first, second.id, UserRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(AuthzError::LastAdmin)));
        assert_eq!(
            store.find_user(&acme.scope(), second.id).await.unwrap().unwrap().role,
            UserRole::Admin
        );
    }

    #[tokio::test]
    async fn test_delete_user_detaches_tasks() {
        let (store, acme) = acme().await;
        let scope = acme.scope();
        let member = store
            .seed_user(&scope, "Mia", "mia@acme.test", UserRole::Member)
            .await
            .unwrap();
        let p = project(&store, &scope, "Alpha").await;
        let created = store
            .create_task(
                &scope,
                CreateTask {
                    project_id: p.id,
                    title: "Assigned".to_string(),
                    assignee_id: Some(member.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.assignee.as_ref().map(|a| a.id), Some(member.id));

        store.delete_user(&acme.principal(), member.id).await.unwrap();

        let task = store.find_task(&scope, created.task.id).await.unwrap().unwrap();
        assert_eq!(task.task.assignee_id, None);
        assert!(task.assignee.is_none());

        let again = store.delete_user(&acme.principal(), member.id).await;
        assert!(matches!(again, Err(StoreError::NotFound("user"))));
    }

    #[tokio::test]
    async fn test_concurrent_demotions_keep_an_admin() {
        let store = Arc::new(MemoryStore::new());
        let acme = store
            .seed_tenant("Acme", "acme", "a@acme.test")
            .await
            .unwrap();
        let b = store
            .seed_user(&acme.scope(), "B", "b@acme.test", UserRole::Admin)
            .await
            .unwrap();
        let a_principal = acme.principal();
        let b_principal = Principal::from(&b);
        let a_id = acme.user.id;

        let s1 = store.clone();
        let s2 = store.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.change_role(&a_principal, b.id, UserRole::Member).await }),
            tokio::spawn(async move { s2.change_role(&b_principal, a_id, UserRole::Member).await }),
        );

        let succeeded = [r1.unwrap().is_ok(), r2.unwrap().is_ok()];
        assert_eq!(succeeded.iter().filter(|ok| **ok).count(), 1);

        let admins = store
            .list_users(&acme.scope())
            .await
            .unwrap()
            .into_iter()
            .filter(|u| u.role == UserRole::Admin)
            .count();
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn test_projects_are_tenant_scoped() {
        let (store, acme) = acme().await;
        let globex = store
            .seed_tenant("Globex", "globex", "admin@globex.test")
            .await
            .unwrap();
        let alpha = project(&store, &acme.scope(), "Alpha").await;

        assert_eq!(alpha.tenant_id, acme.tenant.id);
        assert!(store.find_project(&globex.scope(), alpha.id).await.unwrap().is_none());
        assert!(store
            .update_project(
                &globex.scope(),
                alpha.id,
                UpdateProject {
                    name: "Hijacked".to_string(),
                    description: None
                }
            )
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_project(&globex.scope(), alpha.id).await.unwrap());
        assert!(store.list_projects(&globex.scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_project_summaries_newest_first_with_counts() {
        let (store, acme) = acme().await;
        let scope = acme.scope();
        let older = project(&store, &scope, "Older").await;
        let newer = project(&store, &scope, "Newer").await;

        let t1 = task(&store, &scope, older.id, "one").await;
        task(&store, &scope, older.id, "two").await;
        store
            .update_task(
                &scope,
                t1.task.id,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let summaries = store.list_projects(&scope).await.unwrap();
        assert_eq!(summaries[0].project.id, newer.id);
        assert_eq!(summaries[1].project.id, older.id);
        assert_eq!(summaries[1].total_tasks, 2);
        assert_eq!(summaries[1].completed_tasks, 1);
        assert_eq!(summaries[0].total_tasks, 0);
    }

    #[tokio::test]
    async fn test_delete_project_cascades_tasks() {
        let (store, acme) = acme().await;
        let scope = acme.scope();
        let p = project(&store, &scope, "Alpha").await;
        let t = task(&store, &scope, p.id, "child").await;

        assert!(store.delete_project(&scope, p.id).await.unwrap());
        assert!(store.find_task(&scope, t.task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_task_rules() {
        let (store, acme) = acme().await;
        let globex = store
            .seed_tenant("Globex", "globex", "admin@globex.test")
            .await
            .unwrap();
        let scope = acme.scope();
        let p = project(&store, &scope, "Alpha").await;

        let foreign_project = store
            .create_task(
                &globex.scope(),
                CreateTask {
                    project_id: p.id,
                    title: "x".to_string(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(foreign_project, Err(StoreError::NotFound("project"))));

        let foreign_assignee = store
            .create_task(
                &scope,
                CreateTask {
                    project_id: p.id,
                    title: "x".to_string(),
                    assignee_id: Some(globex.user.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(foreign_assignee, Err(StoreError::InvalidReference(_))));

        let created = task(&store, &scope, p.id, "Plan").await;
        assert_eq!(created.task.status, TaskStatus::Todo);
        assert_eq!(created.task.priority, TaskPriority::Medium);

        let bad_update = store
            .update_task(
                &scope,
                created.task.id,
                UpdateTask {
                    assignee_id: Some(Some(globex.user.id)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_update, Err(StoreError::InvalidReference(_))));

        assert!(store.find_task(&globex.scope(), created.task.id).await.unwrap().is_none());
        assert!(!store.delete_task(&globex.scope(), created.task.id).await.unwrap());
        assert!(store.delete_task(&scope, created.task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_tasks_filters_and_sorts() {
        let (store, acme) = acme().await;
        let scope = acme.scope();
        let p = project(&store, &scope, "Alpha").await;
        let q = project(&store, &scope, "Beta").await;

        for (project_id, title, priority) in [
            (p.id, "b-low", TaskPriority::Low),
            (p.id, "a-high", TaskPriority::High),
            (q.id, "c-medium", TaskPriority::Medium),
        ] {
            store
                .create_task(
                    &scope,
                    CreateTask {
                        project_id,
                        title: title.to_string(),
                        priority: Some(priority),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let by_title = store
            .list_tasks(
                &scope,
                &TaskQuery {
                    sort: TaskSort::from_params(Some("title"), Some("asc")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let titles: Vec<_> = by_title.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["a-high", "b-low", "c-medium"]);

        let in_p = store
            .list_tasks(
                &scope,
                &TaskQuery {
                    project_id: Some(p.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(in_p.len(), 2);
        assert_eq!(in_p[0].task.title, "a-high");

        let open = store
            .list_tasks(
                &scope,
                &TaskQuery {
                    completed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(open.len(), 3);
    }

    #[tokio::test]
    async fn test_profile_and_password_updates() {
        let (store, acme) = acme().await;
        let scope = acme.scope();
        let id = acme.user.id;

        let updated = store
            .update_profile(
                &scope,
                id,
                UpdateProfile {
                    name: Some("Renamed".to_string()),
                    image: Some(Some("https://cdn.acme.test/me.png".to_string())),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        let cleared = store
            .update_profile(
                &scope,
                id,
                UpdateProfile {
                    name: None,
                    image: Some(None),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.name, "Renamed");
        assert!(cleared.image.is_none());

        assert!(store.update_password(&scope, id, "new-hash".to_string()).await.unwrap());
        let other = store
            .seed_tenant("Globex", "globex", "admin@globex.test")
            .await
            .unwrap();
        assert!(!store
            .update_password(&other.scope(), id, "x".to_string())
            .await
            .unwrap());
    }
}
