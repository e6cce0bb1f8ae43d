/// Task model and database operations
///
/// Tasks belong to a project and reach their tenant through it: there is no
/// `tenant_id` column on `tasks`, so every query joins `projects` and filters
/// on `projects.tenant_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'inprogress', 'done');
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Listing
///
/// [`TaskQuery`] carries the list filters and a [`TaskSort`]. The same sort is
/// rendered as SQL by [`TaskSort::order_by`] and applied in memory by
/// [`TaskSort::compare`], so both stores return tasks in the same order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::user::UserSummary;

/// Kanban column of a task
///
/// Variants are declared in board order, which is also the sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Done => "done",
        }
    }

    /// A task is completed exactly when it is in the `done` column
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(ParseEnumError::new("status", s)),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority, declared from lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized enum value in a query string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub project_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub assignee_id: Option<Uuid>,

    pub due_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Task with its assignee embedded, as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,

    pub assignee: Option<UserSummary>,
}

#[derive(sqlx::FromRow)]
struct TaskDetailsRow {
    #[sqlx(flatten)]
    task: Task,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<TaskDetailsRow> for TaskDetails {
    fn from(row: TaskDetailsRow) -> Self {
        let assignee = match (row.task.assignee_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };

        TaskDetails {
            task: row.task,
            assignee,
        }
    }
}

/// Input for creating a task
///
/// `status` and `priority` fall back to `todo` and `MEDIUM`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update
///
/// Outer `None` leaves a field untouched. For the nullable columns,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTask {
    /// Whether the update sets a new (non-null) assignee
    pub fn new_assignee(&self) -> Option<Uuid> {
        self.assignee_id.flatten()
    }

    /// Applies the update to an in-memory task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Sortable task fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortField {
    Title,
    #[default]
    CreatedAt,
    Priority,
    Status,
    DueDate,
}

impl TaskSortField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(TaskSortField::Title),
            "createdAt" => Some(TaskSortField::CreatedAt),
            "priority" => Some(TaskSortField::Priority),
            "status" => Some(TaskSortField::Status),
            "dueDate" => Some(TaskSortField::DueDate),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            TaskSortField::Title => "t.title",
            TaskSortField::CreatedAt => "t.created_at",
            TaskSortField::Priority => "t.priority",
            TaskSortField::Status => "t.status",
            TaskSortField::DueDate => "t.due_date",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Task list ordering
///
/// Ties are broken by newest first, then by ID. Tasks without a due date
/// sort last in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub order: SortOrder,
}

impl TaskSort {
    /// Builds a sort from the `sortBy` / `sortOrder` query parameters
    ///
    /// A missing or unknown `sortBy` yields `createdAt desc` regardless of
    /// `sortOrder`. Any `sortOrder` other than `asc` means descending.
    ///
    /// ```
    /// use taskdeck_shared::models::task::{SortOrder, TaskSort, TaskSortField};
    ///
    /// let sort = TaskSort::from_params(Some("priority"), Some("asc"));
    /// assert_eq!(sort.field, TaskSortField::Priority);
    /// assert_eq!(sort.order, SortOrder::Asc);
    ///
    /// assert_eq!(TaskSort::from_params(Some("bogus"), Some("asc")), TaskSort::default());
    /// ```
    pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        match sort_by.and_then(TaskSortField::parse) {
            Some(field) => TaskSort {
                field,
                order: match sort_order {
                    Some("asc") => SortOrder::Asc,
                    _ => SortOrder::Desc,
                },
            },
            None => TaskSort::default(),
        }
    }

    /// SQL `ORDER BY` body over the `t` alias
    pub fn order_by(&self) -> String {
        let nulls = if self.field == TaskSortField::DueDate {
            " NULLS LAST"
        } else {
            ""
        };

        format!(
            "{} {}{}, t.created_at DESC, t.id ASC",
            self.field.column(),
            self.order.sql(),
            nulls
        )
    }

    /// In-memory equivalent of [`TaskSort::order_by`]
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.field {
            TaskSortField::Title => a.title.cmp(&b.title),
            TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSortField::Priority => a.priority.cmp(&b.priority),
            TaskSortField::Status => a.status.cmp(&b.status),
            TaskSortField::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };

        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };

        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Filters and ordering for listing tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub completed: Option<bool>,
    pub sort: TaskSort,
}

impl TaskQuery {
    /// Whether a task passes every filter
    pub fn matches(&self, task: &Task) -> bool {
        self.project_id.map_or(true, |id| task.project_id == id)
            && self.status.map_or(true, |status| task.status == status)
            && self.priority.map_or(true, |priority| task.priority == priority)
            && self
                .completed
                .map_or(true, |completed| task.status.is_completed() == completed)
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.project_id, t.title, t.description, t.status, t.priority,
           t.assignee_id, t.due_date, t.created_at, t.updated_at,
           u.name AS assignee_name, u.email AS assignee_email
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
    LEFT JOIN users u ON u.id = t.assignee_id
    WHERE p.tenant_id = "#;

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, \
                            assignee_id, due_date, created_at, updated_at";

impl Task {
    /// Inserts a task
    ///
    /// The caller checks that the project and the assignee belong to the
    /// tenant before calling this.
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tasks (project_id, title, description, status, priority, assignee_id, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status.unwrap_or_default())
            .bind(data.priority.unwrap_or_default())
            .bind(data.assignee_id)
            .bind(data.due_date)
            .fetch_one(executor)
            .await?;

        Ok(task)
    }

    /// Finds a task with its assignee, scoped through the project's tenant
    pub async fn find_details<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        builder
            .push_bind(tenant_id)
            .push(" AND t.id = ")
            .push_bind(id);

        let row = builder
            .build_query_as::<TaskDetailsRow>()
            .fetch_optional(executor)
            .await?;

        Ok(row.map(TaskDetails::from))
    }

    /// Lists a tenant's tasks matching `query`
    pub async fn list_details<'e, E>(
        executor: E,
        tenant_id: Uuid,
        query: &TaskQuery,
    ) -> Result<Vec<TaskDetails>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        builder.push_bind(tenant_id);

        if let Some(project_id) = query.project_id {
            builder.push(" AND t.project_id = ").push_bind(project_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = query.priority {
            builder.push(" AND t.priority = ").push_bind(priority);
        }
        match query.completed {
            Some(true) => {
                builder.push(" AND t.status = 'done'");
            }
            Some(false) => {
                builder.push(" AND t.status <> 'done'");
            }
            None => {}
        }

        builder.push(" ORDER BY ").push(query.sort.order_by());

        let rows = builder
            .build_query_as::<TaskDetailsRow>()
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(TaskDetails::from).collect())
    }

    /// Applies a partial update, scoped through the project's tenant
    ///
    /// Returns `None` if the task does not exist in the tenant.
    pub async fn update<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(assignee_id) = data.assignee_id {
            builder.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(due_date) = data.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND project_id IN (SELECT id FROM projects WHERE tenant_id = ")
            .push_bind(tenant_id)
            .push(") RETURNING ")
            .push(TASK_COLUMNS);

        let task = builder
            .build_query_as::<Task>()
            .fetch_optional(executor)
            .await?;

        Ok(task)
    }

    /// Deletes a task, scoped through the project's tenant
    pub async fn delete<'e, E>(executor: E, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
              AND project_id IN (SELECT id FROM projects WHERE tenant_id = $2)
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
