/// Task endpoints
///
/// - `GET    /api/tasks` - list with filters
/// - `POST   /api/tasks` - create
/// - `GET    /api/tasks/team` - every task with the requester's permissions
/// - `GET    /api/tasks/:id` - one task with permissions
/// - `PUT    /api/tasks/:id` - partial update
/// - `DELETE /api/tasks/:id` - delete
/// - `GET    /api/tasks/:id/transitions` - allowed next statuses
///
/// Every authenticated user can read every task. Writes go through the
/// predicates in `teamtask_shared::auth::authorization`; status changes
/// go through the transition table on `TaskStatus`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{double_option, Id, ValidatedJson, ValidatedQuery},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use teamtask_shared::{
    auth::{
        authorization::{require_assign, require_task_delete, require_task_edit, task_permissions, TaskPermissions},
        middleware::AuthContext,
    },
    models::{
        project::Project,
        task::{CreateTask, StatusTransition, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
        user::User,
    },
    schedule::{render_html, Schedule, TimeSlot},
};
use uuid::Uuid;
use validator::Validate;

const MAX_MODULE_NAME_LEN: usize = 255;
const MAX_ESTIMATED_HOURS: f64 = 10_000.0;

/// Which tasks `GET /api/tasks` returns for a non-admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskScope {
    /// Tasks the requester created or is assigned to
    Mine,
    All,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub module_name: Option<String>,

    #[validate(length(max = 200, message = "Search must be at most 200 characters"))]
    pub search: Option<String>,

    /// Defaults to `mine` for users and `all` for admins
    pub scope: Option<TaskScope>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to `todo`
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub priority: TaskPriority,

    pub due_date: Option<NaiveDate>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,

    #[validate(length(max = 255, message = "Module name must be at most 255 characters"))]
    pub module_name: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(range(min = 0.0, max = 10000.0, message = "Estimated hours must be between 0 and 10000"))]
    pub estimated_hours: Option<f64>,

    /// Planned work blocks; fills in `description` and `estimated_hours`
    /// when those are omitted
    pub time_slots: Option<Vec<TimeSlot>>,
}

/// Partial update. Absent fields are left alone; `null` clears a nullable one.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub module_name: Option<Option<String>>,

    pub tags: Option<Vec<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub estimated_hours: Option<Option<f64>>,

    /// Reject the update with 409 if the task changed since this timestamp
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    /// Rules the derive can't express on `Option<Option<_>>` fields
    fn check_nullable_fields(&self) -> ApiResult<()> {
        if let Some(Some(module_name)) = &self.module_name {
            if module_name.chars().count() > MAX_MODULE_NAME_LEN {
                return Err(ApiError::invalid(
                    "module_name",
                    "Module name must be at most 255 characters",
                ));
            }
        }
        if let Some(Some(hours)) = self.estimated_hours {
            if !(0.0..=MAX_ESTIMATED_HOURS).contains(&hours) {
                return Err(ApiError::invalid(
                    "estimated_hours",
                    "Estimated hours must be between 0 and 10000",
                ));
            }
        }
        Ok(())
    }
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            project_id: req.project_id,
            assigned_to: req.assigned_to,
            module_name: req.module_name,
            tags: req.tags,
            estimated_hours: req.estimated_hours,
            expected_updated_at: req.expected_updated_at,
        }
    }
}

/// A task as seen by one requester
#[derive(Debug, Serialize)]
pub struct TaskWithPermissions {
    #[serde(flatten)]
    pub task: Task,
    pub permissions: TaskPermissions,
}

impl TaskWithPermissions {
    pub fn new(task: Task, auth: &AuthContext) -> Self {
        let permissions = task_permissions(&task, auth);
        Self { task, permissions }
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionsResponse {
    pub task_id: Uuid,
    pub current: TaskStatus,
    pub transitions: &'static [StatusTransition],
}

/// Builds the database filter, scoping non-admins to their own tasks unless
/// they ask for `scope=all`
fn task_filter(query: ListTasksQuery, auth: &AuthContext) -> TaskFilter {
    let scope = query
        .scope
        .unwrap_or(if auth.is_admin() { TaskScope::All } else { TaskScope::Mine });

    TaskFilter {
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
        created_by: query.created_by,
        project_id: query.project_id,
        module_name: query.module_name.filter(|m| !m.is_empty()),
        search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        involving: (scope == TaskScope::Mine).then_some(auth.user_id),
    }
}

/// Staying in the same status is always allowed; anything else must be in the
/// transition table
fn check_status_change(current: TaskStatus, target: Option<TaskStatus>) -> ApiResult<()> {
    match target {
        Some(target) if target != current && !current.can_transition_to(target) => {
            Err(ApiError::BadRequest(format!(
                "Cannot change status from {} to {}",
                current, target
            )))
        }
        _ => Ok(()),
    }
}

const STALE_TASK: &str = "Task was modified by someone else; reload and try again";

/// An `expected_updated_at` that no longer matches is a conflict even when
/// nothing else would change
fn check_version(task: &Task, expected: Option<DateTime<Utc>>) -> ApiResult<()> {
    match expected {
        Some(expected) if expected != task.updated_at => {
            Err(ApiError::Conflict(STALE_TASK.to_string()))
        }
        _ => Ok(()),
    }
}

/// Fills `description` and `estimated_hours` from the planned time slots
fn apply_schedule(req: &mut CreateTaskRequest) -> ApiResult<()> {
    let Some(slots) = req.time_slots.take() else {
        return Ok(());
    };

    let schedule = Schedule::from_slots(slots)?;

    if req.description.as_deref().map_or(true, |d| d.trim().is_empty()) {
        req.description = Some(render_html(&schedule));
    }
    if req.estimated_hours.is_none() {
        req.estimated_hours = Some(schedule.total_hours);
    }

    Ok(())
}

async fn ensure_assignee_exists(pool: &PgPool, assignee: Option<Uuid>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if !User::exists(pool, user_id).await? {
            return Err(ApiError::invalid("assigned_to", "Assigned user does not exist"));
        }
    }
    Ok(())
}

async fn ensure_project_exists(pool: &PgPool, project_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(project_id) = project_id {
        if !Project::exists(pool, project_id).await? {
            return Err(ApiError::invalid("project_id", "Project does not exist"));
        }
    }
    Ok(())
}

async fn load_task(pool: &PgPool, id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<ApiResponse<Vec<TaskWithPermissions>>> {
    let filter = task_filter(query, &auth);
    let tasks = Task::list(&state.db, &filter).await?;

    let tasks = tasks
        .into_iter()
        .map(|task| TaskWithPermissions::new(task, &auth))
        .collect();

    Ok(ApiResponse::ok("Tasks retrieved", tasks))
}

/// Create a task
///
/// ```text
/// POST /api/tasks
/// {
///   "title": "Write report",
///   "assigned_to": "uuid",
///   "due_date": "2024-03-08",
///   "time_slots": [{ "date": "2024-03-04", "start_time": "09:00", "end_time": "10:30" }]
/// }
/// ```
///
/// # Errors
///
/// - `400`: invalid fields, unknown assignee or project, bad time slots
/// - `403`: a non-admin assigning to someone else
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(mut req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskWithPermissions>> {
    if req.title.trim().is_empty() {
        return Err(ApiError::invalid("title", "Title is required"));
    }

    require_assign(&auth, req.assigned_to)?;
    apply_schedule(&mut req)?;
    ensure_assignee_exists(&state.db, req.assigned_to).await?;
    ensure_project_exists(&state.db, req.project_id).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status.unwrap_or(TaskStatus::Todo),
            priority: req.priority,
            due_date: req.due_date,
            project_id: req.project_id,
            assigned_to: req.assigned_to,
            created_by: auth.user_id,
            module_name: req.module_name.filter(|m| !m.trim().is_empty()),
            tags: req.tags,
            estimated_hours: req.estimated_hours,
        },
    )
    .await?;

    Ok(ApiResponse::created(
        "Task created",
        TaskWithPermissions::new(task, &auth),
    ))
}

/// Every task with the requester's permission flags, for the team view
pub async fn team_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<TaskWithPermissions>>> {
    let tasks = Task::list_all(&state.db)
        .await?
        .into_iter()
        .map(|task| TaskWithPermissions::new(task, &auth))
        .collect();

    Ok(ApiResponse::ok("Team tasks retrieved", tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
) -> ApiResult<ApiResponse<TaskWithPermissions>> {
    let task = load_task(&state.db, id).await?;
    Ok(ApiResponse::ok("Task retrieved", TaskWithPermissions::new(task, &auth)))
}

/// Partially update a task
///
/// # Errors
///
/// - `400`: a status change outside the transition table, bad fields
/// - `403`: requester is neither admin, creator nor assignee; or a non-admin
///   reassigning to someone else
/// - `404`: no such task
/// - `409`: `expected_updated_at` no longer matches
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskWithPermissions>> {
    req.check_nullable_fields()?;

    let task = load_task(&state.db, id).await?;
    require_task_edit(&task, &auth)?;
    check_version(&task, req.expected_updated_at)?;
    check_status_change(task.status, req.status)?;

    if let Some(assignee) = req.assigned_to {
        if assignee != task.assigned_to {
            require_assign(&auth, assignee)?;
            ensure_assignee_exists(&state.db, assignee).await?;
        }
    }
    if let Some(project_id) = req.project_id {
        ensure_project_exists(&state.db, project_id).await?;
    }
    if matches!(&req.title, Some(title) if title.trim().is_empty()) {
        return Err(ApiError::invalid("title", "Title is required"));
    }

    let update = UpdateTask::from(req);
    if update.is_empty() {
        return Ok(ApiResponse::ok(
            "No changes",
            TaskWithPermissions::new(task, &auth),
        ));
    }

    let expected = update.expected_updated_at;
    let updated = match Task::update(&state.db, id, update).await? {
        Some(updated) => updated,
        None if expected.is_some() && Task::find_by_id(&state.db, id).await?.is_some() => {
            return Err(ApiError::Conflict(STALE_TASK.to_string()));
        }
        None => return Err(ApiError::NotFound("Task not found".to_string())),
    };

    if updated.status != task.status {
        tracing::info!(
            task_id = %id,
            from = task.status.as_str(),
            to = updated.status.as_str(),
            user_id = %auth.user_id,
            "Task status changed"
        );
    }

    Ok(ApiResponse::ok(
        "Task updated",
        TaskWithPermissions::new(updated, &auth),
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
) -> ApiResult<ApiResponse<()>> {
    let task = load_task(&state.db, id).await?;
    require_task_delete(&task, &auth)?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");

    Ok(ApiResponse::message("Task deleted"))
}

pub async fn task_transitions(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<ApiResponse<TransitionsResponse>> {
    let task = load_task(&state.db, id).await?;

    Ok(ApiResponse::ok(
        "Transitions retrieved",
        TransitionsResponse {
            task_id: task.id,
            current: task.status,
            transitions: task.status.transitions(),
        },
    ))
}
