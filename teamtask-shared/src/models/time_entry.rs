/// Time entry model and database operations
///
/// A time entry is a block of hours one user logged against one task on one
/// day. Only the owning user writes their entries; admins read aggregates.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE time_entries (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     hours DOUBLE PRECISION NOT NULL CHECK (hours > 0 AND hours <= 24),
///     date DATE NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Upper bound on hours in a single entry
pub const MAX_HOURS_PER_ENTRY: f64 = 24.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub hours: f64,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimeEntry {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub hours: f64,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTimeEntry {
    pub task_id: Option<Uuid>,
    pub hours: Option<f64>,
    pub date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
}

/// Filters for listing entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEntryFilter {
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Total hours one user logged on one task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeSummaryRow {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub total_hours: f64,
    pub entry_count: i64,
}

/// Whether `hours` is a loggable amount
pub fn is_valid_hours(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0 && hours <= MAX_HOURS_PER_ENTRY
}

impl TimeEntry {
    pub async fn create(pool: &PgPool, data: CreateTimeEntry) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries (user_id, task_id, hours, date, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, task_id, hours, date, description, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.task_id)
        .bind(data.hours)
        .bind(data.date)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        tracing::debug!(entry_id = %entry.id, hours = entry.hours, "Time entry logged");

        Ok(entry)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, user_id, task_id, hours, date, description, created_at, updated_at
            FROM time_entries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Lists entries matching a filter, most recent day first
    pub async fn list(pool: &PgPool, filter: &TimeEntryFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = String::from(
            "SELECT id, user_id, task_id, hours, date, description, created_at, updated_at \
             FROM time_entries WHERE TRUE",
        );
        let mut bind_count = 0;

        if filter.user_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND user_id = ${}", bind_count));
        }
        if filter.task_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND task_id = ${}", bind_count));
        }
        if filter.from.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND date >= ${}", bind_count));
        }
        if filter.to.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND date <= ${}", bind_count));
        }
        query.push_str(" ORDER BY date DESC, created_at DESC");

        let mut q = sqlx::query_as::<_, TimeEntry>(&query);
        if let Some(user_id) = filter.user_id {
            q = q.bind(user_id);
        }
        if let Some(task_id) = filter.task_id {
            q = q.bind(task_id);
        }
        if let Some(from) = filter.from {
            q = q.bind(from);
        }
        if let Some(to) = filter.to {
            q = q.bind(to);
        }

        let entries = q.fetch_all(pool).await?;

        Ok(entries)
    }

    /// Sums hours per (user, task), optionally for a single user
    pub async fn summary(
        pool: &PgPool,
        user_id: Option<Uuid>,
    ) -> Result<Vec<TimeSummaryRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TimeSummaryRow>(
            r#"
            SELECT user_id, task_id,
                   SUM(hours)::FLOAT8 AS total_hours,
                   COUNT(*) AS entry_count
            FROM time_entries
            WHERE ($1::UUID IS NULL OR user_id = $1)
            GROUP BY user_id, task_id
            ORDER BY user_id, task_id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTimeEntry,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE time_entries SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.task_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", task_id = ${}", bind_count));
        }
        if data.hours.is_some() {
            bind_count += 1;
            query.push_str(&format!(", hours = ${}", bind_count));
        }
        if data.date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", date = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        query.push_str(
            " WHERE id = $1 RETURNING id, user_id, task_id, hours, date, description, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, TimeEntry>(&query).bind(id);
        if let Some(task_id) = data.task_id {
            q = q.bind(task_id);
        }
        if let Some(hours) = data.hours {
            q = q.bind(hours);
        }
        if let Some(date) = data.date {
            q = q.bind(date);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        let entry = q.fetch_optional(pool).await?;

        Ok(entry)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
