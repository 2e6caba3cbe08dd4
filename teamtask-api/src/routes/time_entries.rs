/// Time tracking endpoints
///
/// - `GET    /api/time-entries` - own entries; admins may pass `user_id` or `all=true`
/// - `POST   /api/time-entries` - log hours against a task
/// - `GET    /api/time-entries/summary` - hours per (user, task)
/// - `PUT    /api/time-entries/:id` - owner only
/// - `DELETE /api/time-entries/:id` - owner only

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
    auth::{
        authorization::require_time_entry_owner,
        middleware::AuthContext,
    },
    models::{
        task::Task,
        time_entry::{
            is_valid_hours, CreateTimeEntry, TimeEntry, TimeEntryFilter, TimeSummaryRow,
            UpdateTimeEntry,
        },
    },
};
use uuid::Uuid;
use validator::Validate;

const INVALID_HOURS: &str = "Hours must be greater than 0 and at most 24";
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListEntriesQuery {
    /// Admin only: another user's entries
    pub user_id: Option<Uuid>,

    /// Admin only: every user's entries
    #[serde(default)]
    pub all: bool,

    pub task_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SummaryQuery {
    /// Admin only; without it admins get every user
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEntryRequest {
    pub task_id: Uuid,
    pub hours: f64,
    pub date: NaiveDate,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEntryRequest {
    pub task_id: Option<Uuid>,
    pub hours: Option<f64>,
    pub date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl UpdateEntryRequest {
    /// `description` can be cleared with `null`, so it is checked by hand
    fn check_description(&self) -> ApiResult<()> {
        if let Some(Some(description)) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ApiError::invalid(
                    "description",
                    "Description must be at most 1000 characters",
                ));
            }
        }
        Ok(())
    }
}

/// Whose entries a request may read
///
/// Users only ever see their own. Admins default to their own too, and widen
/// with `user_id` or `all`.
fn entry_filter(query: ListEntriesQuery, auth: &AuthContext) -> ApiResult<TimeEntryFilter> {
    let user_id = if auth.is_admin() {
        match (query.user_id, query.all) {
            (Some(user_id), _) => Some(user_id),
            (None, true) => None,
            (None, false) => Some(auth.user_id),
        }
    } else {
        if query.all || query.user_id.is_some_and(|id| id != auth.user_id) {
            return Err(ApiError::Forbidden(
                "Only admins can view other users' time entries".to_string(),
            ));
        }
        Some(auth.user_id)
    };

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::invalid("from", "'from' must not be after 'to'"));
        }
    }

    Ok(TimeEntryFilter {
        user_id,
        task_id: query.task_id,
        from: query.from,
        to: query.to,
    })
}

fn summary_scope(query: SummaryQuery, auth: &AuthContext) -> ApiResult<Option<Uuid>> {
    if auth.is_admin() {
        return Ok(query.user_id);
    }
    match query.user_id {
        Some(id) if id != auth.user_id => Err(ApiError::Forbidden(
            "Only admins can view other users' time summaries".to_string(),
        )),
        _ => Ok(Some(auth.user_id)),
    }
}

fn check_hours(hours: f64) -> ApiResult<()> {
    if !is_valid_hours(hours) {
        return Err(ApiError::invalid("hours", INVALID_HOURS));
    }
    Ok(())
}

async fn ensure_task_exists(pool: &PgPool, task_id: Uuid) -> ApiResult<()> {
    if Task::find_by_id(pool, task_id).await?.is_none() {
        return Err(ApiError::invalid("task_id", "Task does not exist"));
    }
    Ok(())
}

async fn load_own_entry(pool: &PgPool, id: Uuid, auth: &AuthContext) -> ApiResult<TimeEntry> {
    let entry = TimeEntry::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Time entry not found".to_string()))?;

    require_time_entry_owner(&entry, auth)?;

    Ok(entry)
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedQuery(query): ValidatedQuery<ListEntriesQuery>,
) -> ApiResult<ApiResponse<Vec<TimeEntry>>> {
    let filter = entry_filter(query, &auth)?;
    let entries = TimeEntry::list(&state.db, &filter).await?;

    Ok(ApiResponse::ok("Time entries retrieved", entries))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateEntryRequest>,
) -> ApiResult<ApiResponse<TimeEntry>> {
    check_hours(req.hours)?;
    ensure_task_exists(&state.db, req.task_id).await?;

    let entry = TimeEntry::create(
        &state.db,
        CreateTimeEntry {
            user_id: auth.user_id,
            task_id: req.task_id,
            hours: req.hours,
            date: req.date,
            description: req.description,
        },
    )
    .await?;

    Ok(ApiResponse::created("Time entry logged", entry))
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedQuery(query): ValidatedQuery<SummaryQuery>,
) -> ApiResult<ApiResponse<Vec<TimeSummaryRow>>> {
    let user_id = summary_scope(query, &auth)?;
    let rows = TimeEntry::summary(&state.db, user_id).await?;

    Ok(ApiResponse::ok("Time summary retrieved", rows))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
    ValidatedJson(req): ValidatedJson<UpdateEntryRequest>,
) -> ApiResult<ApiResponse<TimeEntry>> {
    req.check_description()?;
    load_own_entry(&state.db, id, &auth).await?;

    if let Some(hours) = req.hours {
        check_hours(hours)?;
    }
    if let Some(task_id) = req.task_id {
        ensure_task_exists(&state.db, task_id).await?;
    }

    let entry = TimeEntry::update(
        &state.db,
        id,
        UpdateTimeEntry {
            task_id: req.task_id,
            hours: req.hours,
            date: req.date,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Time entry not found".to_string()))?;

    Ok(ApiResponse::ok("Time entry updated", entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(id): Id,
) -> ApiResult<ApiResponse<()>> {
    load_own_entry(&state.db, id, &auth).await?;

    if !TimeEntry::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Time entry not found".to_string()));
    }

    Ok(ApiResponse::message("Time entry deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use teamtask_shared::models::user::UserRole;

    fn users() -> (AuthContext, AuthContext) {
        (
            AuthContext::new(Uuid::new_v4(), UserRole::Admin),
            AuthContext::new(Uuid::new_v4(), UserRole::User),
        )
    }

    #[test]
    fn test_users_only_read_their_own_entries() {
        let (_, user) = users();

        let filter = entry_filter(ListEntriesQuery::default(), &user).unwrap();
        assert_eq!(filter.user_id, Some(user.user_id));

        let own = ListEntriesQuery {
            user_id: Some(user.user_id),
            ..Default::default()
        };
        assert!(entry_filter(own, &user).is_ok());

        let other = ListEntriesQuery {
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(entry_filter(other, &user).unwrap_err().status(), StatusCode::FORBIDDEN);

        let all = ListEntriesQuery {
            all: true,
            ..Default::default()
        };
        assert_eq!(entry_filter(all, &user).unwrap_err().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_admin_entry_scopes() {
        let (admin, _) = users();
        let someone = Uuid::new_v4();

        let filter = entry_filter(ListEntriesQuery::default(), &admin).unwrap();
        assert_eq!(filter.user_id, Some(admin.user_id));

        let all = ListEntriesQuery {
            all: true,
            ..Default::default()
        };
        assert_eq!(entry_filter(all, &admin).unwrap().user_id, None);

        let one = ListEntriesQuery {
            user_id: Some(someone),
            ..Default::default()
        };
        assert_eq!(entry_filter(one, &admin).unwrap().user_id, Some(someone));
    }

    #[test]
    fn test_reversed_date_range_is_invalid() {
        let (_, user) = users();
        let query = ListEntriesQuery {
            from: NaiveDate::from_ymd_opt(2024, 3, 10),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        assert_eq!(entry_filter(query, &user).unwrap_err().code(), "validation_error");
    }

    #[test]
    fn test_summary_scope() {
        let (admin, user) = users();

        assert_eq!(summary_scope(SummaryQuery::default(), &admin).unwrap(), None);
        assert_eq!(
            summary_scope(SummaryQuery::default(), &user).unwrap(),
            Some(user.user_id)
        );
        assert!(summary_scope(
            SummaryQuery {
                user_id: Some(admin.user_id)
            },
            &user
        )
        .is_err());
    }

    #[test]
    fn test_update_description_is_capped_like_create() {
        let at_limit: UpdateEntryRequest =
            serde_json::from_value(serde_json::json!({ "description": "x".repeat(1000) })).unwrap();
        assert!(at_limit.check_description().is_ok());

        let cleared: UpdateEntryRequest =
            serde_json::from_value(serde_json::json!({ "description": null })).unwrap();
        assert!(cleared.check_description().is_ok());

        let too_long: UpdateEntryRequest =
            serde_json::from_value(serde_json::json!({ "description": "x".repeat(1001) })).unwrap();
        let err = too_long.check_description().unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_hours_bounds() {
        assert!(check_hours(0.25).is_ok());
        assert!(check_hours(24.0).is_ok());
        assert!(check_hours(0.0).is_err());
        assert!(check_hours(-1.0).is_err());
        assert!(check_hours(24.5).is_err());
        assert!(check_hours(f64::NAN).is_err());
    }
}
