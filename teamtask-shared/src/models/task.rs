/// Task model and database operations
///
/// Tasks are the core entity: a unit of work created by one user, optionally
/// assigned to another, grouped by project and by module label.
///
/// # State Machine
///
/// ```text
/// todo        → in_progress (Start), done (Complete)
/// in_progress → paused (Pause), done (Complete), review (Mark for Review)
/// review      → in_progress (Resume), done (Complete)
/// done        → in_progress (Reopen), todo (Mark as To Do)
/// paused      → in_progress (Resume), done (Complete), todo (Mark as To Do)
/// ```
///
/// `todo` cannot be paused and `done` cannot go back to `review`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'done', 'paused');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date DATE,
///     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     module_name VARCHAR(255),
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     estimated_hours DOUBLE PRECISION,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamtask_shared::models::task::{Task, CreateTask, TaskStatus, TaskPriority, UpdateTask};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Write release notes".to_string(),
///     created_by: creator,
///     ..CreateTask::default()
/// }).await?;
///
/// assert!(task.status.can_transition_to(TaskStatus::InProgress));
///
/// Task::update(&pool, task.id, UpdateTask {
///     status: Some(TaskStatus::InProgress),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
    Paused,
}

/// One edge of the status table, with the label shown on the action button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub to: TaskStatus,
    pub label: &'static str,
}

const FROM_TODO: &[StatusTransition] = &[
    StatusTransition { to: TaskStatus::InProgress, label: "Start" },
    StatusTransition { to: TaskStatus::Done, label: "Complete" },
];

const FROM_IN_PROGRESS: &[StatusTransition] = &[
    StatusTransition { to: TaskStatus::Paused, label: "Pause" },
    StatusTransition { to: TaskStatus::Done, label: "Complete" },
    StatusTransition { to: TaskStatus::Review, label: "Mark for Review" },
];

const FROM_REVIEW: &[StatusTransition] = &[
    StatusTransition { to: TaskStatus::InProgress, label: "Resume" },
    StatusTransition { to: TaskStatus::Done, label: "Complete" },
];

const FROM_DONE: &[StatusTransition] = &[
    StatusTransition { to: TaskStatus::InProgress, label: "Reopen" },
    StatusTransition { to: TaskStatus::Todo, label: "Mark as To Do" },
];

const FROM_PAUSED: &[StatusTransition] = &[
    StatusTransition { to: TaskStatus::InProgress, label: "Resume" },
    StatusTransition { to: TaskStatus::Done, label: "Complete" },
    StatusTransition { to: TaskStatus::Todo, label: "Mark as To Do" },
];

impl TaskStatus {
    /// Every status, in board order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Paused,
    ];

    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Paused => "paused",
        }
    }

    /// Allowed next statuses from this one, in display order
    pub fn transitions(&self) -> &'static [StatusTransition] {
        match self {
            TaskStatus::Todo => FROM_TODO,
            TaskStatus::InProgress => FROM_IN_PROGRESS,
            TaskStatus::Review => FROM_REVIEW,
            TaskStatus::Done => FROM_DONE,
            TaskStatus::Paused => FROM_PAUSED,
        }
    }

    /// Checks if the transition to `target` is in the table
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        self.transitions().iter().any(|t| t.to == target)
    }

    /// Label of the action that moves this status to `target`
    pub fn transition_label(&self, target: TaskStatus) -> Option<&'static str> {
        self.transitions()
            .iter()
            .find(|t| t.to == target)
            .map(|t| t.label)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    /// Rich-text (HTML) description
    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<NaiveDate>,

    pub project_id: Option<Uuid>,

    /// Assignee (None if unassigned or the assignee was deleted)
    pub assigned_to: Option<Uuid>,

    /// Creator and owner
    pub created_by: Uuid,

    /// Free-text module label, usually `Month-WeekN-username-subject`
    pub module_name: Option<String>,

    pub tags: Vec<String>,

    pub estimated_hours: Option<f64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is past its due date and not finished
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && !self.status.is_done(),
            None => false,
        }
    }

    /// Whether `user_id` created or is assigned to this task
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.created_by == user_id || self.assigned_to == Some(user_id)
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub module_name: Option<String>,
    pub tags: Vec<String>,
    pub estimated_hours: Option<f64>,
}

impl Default for CreateTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            project_id: None,
            assigned_to: None,
            created_by: Uuid::nil(),
            module_name: None,
            tags: Vec::new(),
            estimated_hours: None,
        }
    }
}

/// Partial update for a task
///
/// Outer `None` leaves a field untouched; for nullable columns `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub project_id: Option<Option<Uuid>>,
    pub assigned_to: Option<Option<Uuid>>,
    pub module_name: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<Option<f64>>,

    /// When set, the update only applies if the row's `updated_at` still matches
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl UpdateTask {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.project_id.is_none()
            && self.assigned_to.is_none()
            && self.module_name.is_none()
            && self.tags.is_none()
            && self.estimated_hours.is_none()
    }
}

/// Filters for listing tasks. All set filters are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub module_name: Option<String>,

    /// Case-insensitive substring match on the title
    pub search: Option<String>,

    /// Restrict to tasks created by or assigned to this user
    pub involving: Option<Uuid>,
}

/// Number of tasks in one status under one module label
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModuleStatusCount {
    pub module_name: String,
    pub status: TaskStatus,
    pub count: i64,
}

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, project_id, \
     assigned_to, created_by, module_name, tags, estimated_hours, created_at, updated_at";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (title, description, status, priority, due_date, project_id,
                               assigned_to, created_by, module_name, tags, estimated_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TASK_COLUMNS}
            "#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.project_id)
            .bind(data.assigned_to)
            .bind(data.created_by)
            .bind(data.module_name)
            .bind(data.tags)
            .bind(data.estimated_hours)
            .fetch_one(pool)
            .await?;

        tracing::info!(task_id = %task.id, created_by = %task.created_by, "Task created");

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists tasks matching a filter, newest first
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE");
        let mut bind_count = 0;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${}", bind_count));
        }
        if filter.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND assigned_to = ${}", bind_count));
        }
        if filter.created_by.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND created_by = ${}", bind_count));
        }
        if filter.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND project_id = ${}", bind_count));
        }
        if filter.module_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND module_name = ${}", bind_count));
        }
        if filter.search.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND title ILIKE ${}", bind_count));
        }
        if filter.involving.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (created_by = ${0} OR assigned_to = ${0})",
                bind_count
            ));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(assigned_to) = filter.assigned_to {
            q = q.bind(assigned_to);
        }
        if let Some(created_by) = filter.created_by {
            q = q.bind(created_by);
        }
        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(ref module_name) = filter.module_name {
            q = q.bind(module_name.clone());
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(user_id) = filter.involving {
            q = q.bind(user_id);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Lists every task, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        Self::list(pool, &TaskFilter::default()).await
    }

    /// Applies a partial update
    ///
    /// Returns `None` when no row matched: either the task doesn't exist or
    /// `expected_updated_at` was set and is stale. Status transitions are not
    /// checked here; callers validate them against [`TaskStatus::can_transition_to`].
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        let columns: [(&str, bool); 10] = [
            ("title", data.title.is_some()),
            ("description", data.description.is_some()),
            ("status", data.status.is_some()),
            ("priority", data.priority.is_some()),
            ("due_date", data.due_date.is_some()),
            ("project_id", data.project_id.is_some()),
            ("assigned_to", data.assigned_to.is_some()),
            ("module_name", data.module_name.is_some()),
            ("tags", data.tags.is_some()),
            ("estimated_hours", data.estimated_hours.is_some()),
        ];
        for (column, present) in columns {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(" WHERE id = $1");
        if data.expected_updated_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND updated_at = ${}", bind_count));
        }
        query.push_str(&format!(" RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(project_id) = data.project_id {
            q = q.bind(project_id);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }
        if let Some(module_name) = data.module_name {
            q = q.bind(module_name);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(estimated_hours) = data.estimated_hours {
            q = q.bind(estimated_hours);
        }
        if let Some(expected) = data.expected_updated_at {
            q = q.bind(expected);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Counts tasks per (module, status) for every labelled task
    pub async fn module_status_counts(pool: &PgPool) -> Result<Vec<ModuleStatusCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ModuleStatusCount>(
            r#"
            SELECT module_name, status, COUNT(*) AS count
            FROM tasks
            WHERE module_name IS NOT NULL AND module_name <> ''
            GROUP BY module_name, status
            ORDER BY module_name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Deletes a task
    ///
    /// ⚠️  Time entries logged against it are deleted too (CASCADE).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Escapes `%`, `_` and `\` so user input is matched literally by ILIKE
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
