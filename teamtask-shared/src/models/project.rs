/// Project model and database operations
///
/// A project groups tasks under an owner and a set of team members. Its
/// `progress` is not a column: every read derives it from the project's tasks
/// as `round(done / total × 100)`, 0 for a project without tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('planning', 'active', 'on_hold', 'completed', 'archived');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     status project_status NOT NULL DEFAULT 'planning',
///     owner UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     team_members UUID[] NOT NULL DEFAULT '{}',
///     deadline DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    #[serde(rename = "on-hold", alias = "on_hold")]
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Planning,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Archived,
    ];
}

/// Project with its derived progress
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner: Uuid,
    pub team_members: Vec<Uuid>,

    /// Percentage of the project's tasks that are done (0-100)
    pub progress: i32,

    /// Number of tasks in the project
    pub task_count: i64,

    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether the user owns the project or is on its team
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.owner == user_id || self.team_members.contains(&user_id)
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner: Uuid,
    pub team_members: Vec<Uuid>,
    pub deadline: Option<NaiveDate>,
}

/// Partial project update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub team_members: Option<Vec<Uuid>>,
    pub deadline: Option<Option<NaiveDate>>,
}

/// Number of projects in each status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatusCounts {
    pub total: i64,
    pub planning: i64,
    pub active: i64,
    #[serde(rename = "on-hold")]
    pub on_hold: i64,
    pub completed: i64,
    pub archived: i64,
}

impl ProjectStatusCounts {
    /// Folds `(status, count)` rows into per-status totals
    pub fn from_rows(rows: &[(ProjectStatus, i64)]) -> Self {
        let mut counts = Self::default();
        for &(status, count) in rows {
            counts.total += count;
            match status {
                ProjectStatus::Planning => counts.planning += count,
                ProjectStatus::Active => counts.active += count,
                ProjectStatus::OnHold => counts.on_hold += count,
                ProjectStatus::Completed => counts.completed += count,
                ProjectStatus::Archived => counts.archived += count,
            }
        }
        counts
    }
}

// Joins each project with its task counts so progress is always computed
// from the current tasks.
const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.status, p.owner, p.team_members,
           COALESCE(ROUND(100.0 * t.done / NULLIF(t.total, 0)), 0)::INT4 AS progress,
           COALESCE(t.total, 0) AS task_count,
           p.deadline, p.created_at, p.updated_at
    FROM projects p
    LEFT JOIN (
        SELECT project_id,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'done') AS done
        FROM tasks
        WHERE project_id IS NOT NULL
        GROUP BY project_id
    ) t ON t.project_id = p.id
"#;

impl Project {
    /// Creates a project and returns it with its (zero) progress
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO projects (name, description, status, owner, team_members, deadline)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.owner)
        .bind(data.team_members)
        .bind(data.deadline)
        .fetch_one(pool)
        .await?;

        tracing::info!(project_id = %id, owner = %data.owner, "Project created");

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{PROJECT_SELECT} WHERE p.id = $1");

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(project)
    }

    /// Lists projects, optionally only those a user owns or belongs to
    pub async fn list(
        pool: &PgPool,
        status: Option<ProjectStatus>,
        member: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("{PROJECT_SELECT} WHERE TRUE");
        let mut bind_count = 0;

        if status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND p.status = ${}", bind_count));
        }
        if member.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (p.owner = ${0} OR ${0} = ANY(p.team_members))",
                bind_count
            ));
        }
        query.push_str(" ORDER BY p.created_at DESC");

        let mut q = sqlx::query_as::<_, Project>(&query);
        if let Some(status) = status {
            q = q.bind(status);
        }
        if let Some(member) = member {
            q = q.bind(member);
        }

        let projects = q.fetch_all(pool).await?;

        Ok(projects)
    }

    /// Applies a partial update; `None` when the project doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.team_members.is_some() {
            bind_count += 1;
            query.push_str(&format!(", team_members = ${}", bind_count));
        }
        if data.deadline.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deadline = ${}", bind_count));
        }
        query.push_str(" WHERE id = $1");

        let mut q = sqlx::query(&query).bind(id);
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(team_members) = data.team_members {
            q = q.bind(team_members);
        }
        if let Some(deadline) = data.deadline {
            q = q.bind(deadline);
        }

        let result = q.execute(pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Counts projects per status
    pub async fn status_counts(pool: &PgPool) -> Result<ProjectStatusCounts, sqlx::Error> {
        let rows: Vec<(ProjectStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM projects GROUP BY status")
                .fetch_all(pool)
                .await?;

        Ok(ProjectStatusCounts::from_rows(&rows))
    }

    /// Checks whether a project exists
    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Deletes a project. Its tasks are kept and become project-less.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_status_wire_names() {
        assert_eq!(serde_json::to_string(&ProjectStatus::OnHold).unwrap(), "\"on-hold\"");
        assert_eq!(
            serde_json::from_str::<ProjectStatus>("\"on_hold\"").unwrap(),
            ProjectStatus::OnHold
        );
        assert_eq!(
            serde_json::from_str::<ProjectStatus>("\"archived\"").unwrap(),
            ProjectStatus::Archived
        );
        assert_eq!(ProjectStatus::default(), ProjectStatus::Planning);
    }

    #[test]
    fn test_status_counts_from_rows() {
        let counts = ProjectStatusCounts::from_rows(&[
            (ProjectStatus::Active, 3),
            (ProjectStatus::OnHold, 1),
            (ProjectStatus::Completed, 2),
        ]);

        assert_eq!(counts.total, 6);
        assert_eq!(counts.active, 3);
        assert_eq!(counts.on_hold, 1);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.planning, 0);
        assert_eq!(counts.archived, 0);
    }

    #[test]
    fn test_has_member() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            name: "Website".to_string(),
            description: None,
            status: ProjectStatus::Active,
            owner,
            team_members: vec![member],
            progress: 0,
            task_count: 0,
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(project.has_member(owner));
        assert!(project.has_member(member));
        assert!(!project.has_member(Uuid::new_v4()));
    }
}
