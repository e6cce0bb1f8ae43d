/// Project model and database operations
///
/// Projects group tasks and belong to one tenant. Every query here filters on
/// `tenant_id`; a project of another tenant is indistinguishable from one that
/// does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Project with task counters, as returned by the project list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    /// Number of tasks in the project
    pub total_tasks: i64,

    /// Number of tasks with status `done`
    pub completed_tasks: i64,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Full replacement of a project's editable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
}

impl Project {
    pub async fn create<'e, E>(
        executor: E,
        tenant_id: Uuid,
        data: CreateProject,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (tenant_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, name, description, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(executor)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID with tenant isolation
    pub async fn find_in_tenant<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, tenant_id, name, description, created_at, updated_at
            FROM projects
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(project)
    }

    /// Lists a tenant's projects, newest first, with task counters
    pub async fn list_summaries<'e, E>(
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let projects = sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT p.id, p.tenant_id, p.name, p.description, p.created_at, p.updated_at,
                   COUNT(t.id) AS total_tasks,
                   COUNT(t.id) FILTER (WHERE t.status = 'done') AS completed_tasks
            FROM projects p
            LEFT JOIN tasks t ON t.project_id = p.id
            WHERE p.tenant_id = $1
            GROUP BY p.id
            ORDER BY p.created_at DESC, p.id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(projects)
    }

    /// Replaces name and description with tenant isolation
    pub async fn update<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $3, description = $4, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_optional(executor)
        .await?;

        Ok(project)
    }

    /// Deletes a project and, by cascade, its tasks
    pub async fn delete<'e, E>(executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_flat() {
        let summary = ProjectSummary {
            project: Project {
                id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                name: "Alpha".to_string(),
                description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            total_tasks: 3,
            completed_tasks: 1,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["name"], "Alpha");
        assert_eq!(json["totalTasks"], 3);
        assert_eq!(json["completedTasks"], 1);
        assert!(json.get("project").is_none());
    }
}
