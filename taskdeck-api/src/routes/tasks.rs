/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - List tasks (filters and sorting, see [`ListTasksParams`])
/// - `POST /api/tasks` - Create a task in one of the tenant's projects
/// - `GET /api/tasks/:id` - Get a task with its assignee
/// - `PUT /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete a task
///
/// Tasks belong to a tenant through their project. A task whose project is
/// in another tenant answers 404.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use taskdeck_shared::{
    auth::middleware::Principal,
    models::{
        nullable,
        task::{CreateTask, TaskDetails, TaskPriority, TaskQuery, TaskSort, TaskStatus, UpdateTask},
    },
};
use uuid::Uuid;

/// Query string of `GET /api/tasks`
///
/// All values arrive as strings and are parsed by [`ListTasksParams::into_query`],
/// so a malformed value becomes a 400 with a field-level message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksParams {
    pub project_id: Option<String>,

    /// `todo`, `inprogress` or `done`
    pub status: Option<String>,

    /// `LOW`, `MEDIUM` or `HIGH`
    pub priority: Option<String>,

    /// `true` selects tasks in `done`, `false` everything else
    pub completed: Option<String>,

    /// `title`, `createdAt`, `priority`, `status` or `dueDate`
    pub sort_by: Option<String>,

    /// `asc` or `desc` (default)
    pub sort_order: Option<String>,
}

impl ListTasksParams {
    pub fn into_query(self) -> ApiResult<TaskQuery> {
        let project_id = present(self.project_id)
            .map(|id| parse_uuid("projectId", &id))
            .transpose()?;

        let status = present(self.status)
            .map(|s| s.parse::<TaskStatus>())
            .transpose()
            .map_err(|e| ApiError::field(e.field, e.to_string()))?;

        let priority = present(self.priority)
            .map(|p| p.parse::<TaskPriority>())
            .transpose()
            .map_err(|e| ApiError::field(e.field, e.to_string()))?;

        let completed = match present(self.completed).as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(ApiError::field(
                    "completed",
                    format!("Invalid completed: {}", other),
                ))
            }
        };

        Ok(TaskQuery {
            project_id,
            status,
            priority,
            completed,
            sort: TaskSort::from_params(self.sort_by.as_deref(), self.sort_order.as_deref()),
        })
    }
}

/// Create task request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,

    pub description: Option<String>,

    pub project_id: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// Empty string means unassigned
    pub assignee_id: Option<String>,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub due_date: Option<String>,
}

impl CreateTaskRequest {
    fn into_create(self) -> ApiResult<CreateTask> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::field("title", "Task title is required"));
        }
        check_title_length(&title)?;

        let project_id = present(self.project_id)
            .ok_or_else(|| ApiError::field("projectId", "Project ID is required"))?;
        let project_id = parse_uuid("projectId", &project_id)?;

        let assignee_id = present(self.assignee_id)
            .map(|id| parse_uuid("assigneeId", &id))
            .transpose()?;

        let due_date = present(self.due_date)
            .map(|d| parse_due_date(&d))
            .transpose()?;

        Ok(CreateTask {
            project_id,
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            status: self.status,
            priority: self.priority,
            assignee_id,
            due_date,
        })
    }
}

/// Partial task update
///
/// Absent fields are left unchanged. `null` clears `description`,
/// `assigneeId` and `dueDate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub assignee_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub due_date: Option<Option<String>>,
}

impl UpdateTaskRequest {
    fn into_update(self) -> ApiResult<UpdateTask> {
        let title = match self.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ApiError::field("title", "Task title cannot be empty"))
            }
            Some(title) => {
                let title = title.trim().to_string();
                check_title_length(&title)?;
                Some(title)
            }
            None => None,
        };

        let due_date = match self.due_date {
            Some(Some(d)) => Some(Some(parse_due_date(&d)?)),
            Some(None) => Some(None),
            None => None,
        };

        Ok(UpdateTask {
            title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee_id,
            due_date,
        })
    }
}

/// List tasks
///
/// # Query parameters
///
/// `projectId`, `status`, `priority`, `completed`, `sortBy`, `sortOrder`.
/// An unknown `sortBy` falls back to `createdAt desc`; a malformed filter
/// value is a 400.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(params): ApiQuery<ListTasksParams>,
) -> ApiResult<Json<Vec<TaskDetails>>> {
    let query = params.into_query()?;
    let tasks = state.store.list_tasks(&principal.scope(), &query).await?;
    Ok(Json(tasks))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Empty title, missing project ID, or an assignee
///   outside the tenant
/// - `404 Not Found`: Project not in the caller's tenant
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskDetails>)> {
    let data = req.into_create()?;
    let details = state.store.create_task(&principal.scope(), data).await?;

    tracing::info!(
        tenant_id = %principal.tenant_id(),
        project_id = %details.task.project_id,
        task_id = %details.task.id,
        user_id = %principal.user_id(),
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(details)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskDetails>> {
    let task = state
        .store
        .find_task(&principal.scope(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Partially update a task
///
/// # Errors
///
/// - `400 Bad Request`: Empty title, bad due date, or an assignee outside
///   the tenant
/// - `404 Not Found`: Task not in the caller's tenant
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskDetails>> {
    let data = req.into_update()?;

    let details = state
        .store
        .update_task(&principal.scope(), id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::debug!(task_id = %id, user_id = %principal.user_id(), "Task updated");

    Ok(Json(details))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_task(&principal.scope(), id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %id, user_id = %principal.user_id(), "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Matches the `tasks.title` column width
const MAX_TITLE_LEN: usize = 255;

fn check_title_length(title: &str) -> ApiResult<()> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::field(
            "title",
            format!("Task title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

/// Drops empty query/body strings so `?status=` means "no filter"
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_uuid(field: &str, value: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::field(field, format!("Invalid {}: {}", field, value)))
}

/// Parses an RFC 3339 timestamp, or a plain date as midnight UTC
fn parse_due_date(value: &str) -> ApiResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| ApiError::field("dueDate", format!("Invalid dueDate: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};
    use taskdeck_shared::models::task::{SortOrder, TaskSortField};

    fn params(pairs: &[(&str, &str)]) -> ListTasksParams {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let uri: Uri = format!("/api/tasks?{}", query).parse().unwrap();
        Query::<ListTasksParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_default_query() {
        let query = ListTasksParams::default().into_query().unwrap();
        assert_eq!(query, TaskQuery::default());
    }

    #[test]
    fn test_filters_parse() {
        let project = Uuid::new_v4();
        let query = params(&[
            ("projectId", &project.to_string()),
            ("status", "inprogress"),
            ("priority", "HIGH"),
            ("completed", "false"),
            ("sortBy", "dueDate"),
            ("sortOrder", "asc"),
        ])
        .into_query()
        .unwrap();

        assert_eq!(query.project_id, Some(project));
        assert_eq!(query.status, Some(TaskStatus::InProgress));
        assert_eq!(query.priority, Some(TaskPriority::High));
        assert_eq!(query.completed, Some(false));
        assert_eq!(query.sort.field, TaskSortField::DueDate);
        assert_eq!(query.sort.order, SortOrder::Asc);
    }

    #[test]
    fn test_malformed_filters_rejected() {
        for pairs in [
            [("status", "doing")],
            [("priority", "urgent")],
            [("completed", "yes")],
            [("projectId", "p1")],
        ] {
            assert!(
                matches!(params(&pairs).into_query(), Err(ApiError::ValidationError(_))),
                "{:?} should be rejected",
                pairs
            );
        }
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        let query = params(&[("sortBy", "assignee"), ("sortOrder", "asc")])
            .into_query()
            .unwrap();
        assert_eq!(query.sort, TaskSort::default());
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let query = params(&[("status", ""), ("completed", "")]).into_query().unwrap();
        assert_eq!(query.status, None);
        assert_eq!(query.completed, None);
    }

    #[test]
    fn test_create_requires_title_and_project() {
        let req = CreateTaskRequest {
            title: "".to_string(),
            project_id: Some("p1".to_string()),
            ..Default::default()
        };
        assert!(req.into_create().is_err());

        let req = CreateTaskRequest {
            title: "Write docs".to_string(),
            ..Default::default()
        };
        assert!(req.into_create().is_err());
    }

    #[test]
    fn test_create_parses_optional_fields() {
        let project = Uuid::new_v4();
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "  Write docs ",
            "projectId": project.to_string(),
            "assigneeId": "",
            "dueDate": "2025-03-01",
            "priority": "HIGH"
        }))
        .unwrap();

        let create = req.into_create().unwrap();
        assert_eq!(create.title, "Write docs");
        assert_eq!(create.project_id, project);
        assert_eq!(create.assignee_id, None);
        assert_eq!(create.priority, Some(TaskPriority::High));
        assert_eq!(
            create.due_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_update_distinguishes_absent_and_null() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"status": "done", "assigneeId": null}"#).unwrap();
        let update = req.into_update().unwrap();

        assert_eq!(update.status, Some(TaskStatus::Done));
        assert_eq!(update.assignee_id, Some(None));
        assert_eq!(update.title, None);
        assert_eq!(update.due_date, None);
        assert_eq!(update.description, None);
    }

    #[test]
    fn test_update_rejects_empty_title() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": " "}"#).unwrap();
        assert!(req.into_update().is_err());
    }

    #[test]
    fn test_title_length_is_capped() {
        let project = Uuid::new_v4().to_string();

        let req = CreateTaskRequest {
            title: "x".repeat(256),
            project_id: Some(project.clone()),
            ..Default::default()
        };
        assert!(matches!(req.into_create(), Err(ApiError::ValidationError(_))));

        let req = CreateTaskRequest {
            title: "é".repeat(255),
            project_id: Some(project),
            ..Default::default()
        };
        assert!(req.into_create().is_ok());

        let req = UpdateTaskRequest {
            title: Some("x".repeat(256)),
            ..Default::default()
        };
        assert!(matches!(req.into_update(), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(
            parse_due_date("2025-03-01T12:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap()
        );
        assert!(parse_due_date("next tuesday").is_err());
    }
}
