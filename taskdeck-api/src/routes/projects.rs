/// Project endpoints
///
/// # Endpoints
///
/// - `GET /api/projects` - List projects with task counters, newest first
/// - `POST /api/projects` - Create a project
/// - `GET /api/projects/:id` - Get a project
/// - `PUT /api/projects/:id` - Replace name and description
/// - `DELETE /api/projects/:id` - Delete a project and its tasks
///
/// Projects of other tenants answer 404, exactly like missing ones.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskdeck_shared::{
    auth::middleware::Principal,
    models::project::{CreateProject, Project, ProjectSummary, UpdateProject},
};
use uuid::Uuid;
use validator::Validate;

/// Create or update project request
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
}

impl ProjectRequest {
    /// Validated, trimmed name and description
    fn into_parts(self) -> ApiResult<(String, Option<String>)> {
        self.validate()?;

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::field("name", "Project name is required"));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok((name, description))
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = state.store.list_projects(&principal.scope()).await?;
    Ok(Json(projects))
}

/// Create a project in the caller's tenant
///
/// # Errors
///
/// - `400 Bad Request`: Missing or empty name
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let (name, description) = req.into_parts()?;

    let project = state
        .store
        .create_project(&principal.scope(), CreateProject { name, description })
        .await?;

    tracing::info!(
        tenant_id = %project.tenant_id,
        project_id = %project.id,
        user_id = %principal.user_id(),
        "Project created"
    );

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = state
        .store
        .find_project(&principal.scope(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Replace a project's name and description
///
/// An absent `description` clears it.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProjectRequest>,
) -> ApiResult<Json<Project>> {
    let (name, description) = req.into_parts()?;

    let project = state
        .store
        .update_project(&principal.scope(), id, UpdateProject { name, description })
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project.id, user_id = %principal.user_id(), "Project updated");

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_project(&principal.scope(), id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(
        tenant_id = %principal.tenant_id(),
        project_id = %id,
        user_id = %principal.user_id(),
        "Project deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
