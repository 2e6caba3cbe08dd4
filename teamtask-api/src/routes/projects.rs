/// Project endpoints
///
/// - `GET    /api/projects` - list (`?status=active&mine=true`)
/// - `POST   /api/projects` - create; the requester becomes the owner
/// - `GET    /api/projects/counts` - number of projects per status
/// - `GET    /api/projects/:id`
/// - `PUT    /api/projects/:id` - owner or admin
/// - `DELETE /api/projects/:id` - owner or admin
///
/// `progress` is derived from the project's tasks on every read.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, Id, ValidatedJson, ValidatedQuery},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use teamtask_shared::{
    auth::{authorization::require_project_manage, middleware::AuthContext},
    models::{
        project::{CreateProject, Project, ProjectStatus, ProjectStatusCounts, UpdateProject},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListProjectsQuery {
    pub status: Option<ProjectStatus>,

    /// Only projects the requester owns or belongs to
    #[serde(default)]
    pub mine: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub team_members: Vec<Uuid>,

    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,
    pub team_members: Option<Vec<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<NaiveDate>>,
}

impl From<UpdateProjectRequest> for UpdateProject {
    fn from(req: UpdateProjectRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            status: req.status,
            team_members: req.team_members.map(dedup_members),
            deadline: req.deadline,
        }
    }
}

/// Removes repeated member IDs, keeping first occurrences in order
fn dedup_members(mut members: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    members.retain(|id| seen.insert(*id));
    members
}

async fn ensure_members_exist(pool: &PgPool, members: &[Uuid]) -> ApiResult<()> {
    for member in members {
        if !User::exists(pool, *member).await? {
            return Err(ApiError::invalid(
                "team_members",
                format!("User {} does not exist", member),
            ));
        }
    }
    Ok(())
}

async fn load_project(pool: &PgPool, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedQuery(query): ValidatedQuery<ListProjectsQuery>,
) -> ApiResult<ApiResponse<Vec<Project>>> {
    let member = query.mine.then_some(auth.user_id);
    let projects = Project::list(&state.db, query.status, member).await?;

    Ok(ApiResponse::ok("Projects retrieved", projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let team_members = dedup_members(req.team_members);
    ensure_members_exist(&state.db, &team_members).await?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name: req.name.trim().to_string(),
            description: req.description,
            status: req.status,
            owner: auth.user_id,
            team_members,
            deadline: req.deadline,
        },
    )
    .await?;

    Ok(ApiResponse::created("Project created", project))
}

pub async fn project_counts(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<ProjectStatusCounts>> {
    let counts = Project::status_counts(&state.db).await?;
    Ok(ApiResponse::ok("Project counts retrieved", counts))
}

pub async fn get_project(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<ApiResponse<Project>> {
    let project = load_project(&state.db, id).await?;
    Ok(ApiResponse::ok("Project retrieved", project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&project, &auth)?;

    if matches!(&req.name, Some(name) if name.trim().is_empty()) {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let update = UpdateProject::from(req);
    if let Some(members) = &update.team_members {
        ensure_members_exist(&state.db, members).await?;
    }

    let project = Project::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(ApiResponse::ok("Project updated", project))
}

/// Tasks in the project are kept and lose their `project_id`
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
) -> ApiResult<ApiResponse<()>> {
    let project = load_project(&state.db, id).await?;
    require_project_manage(&project, &auth)?;

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");

    Ok(ApiResponse::message("Project deleted"))
}
