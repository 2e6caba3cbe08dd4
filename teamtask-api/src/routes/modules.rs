/// Module grouping endpoints
///
/// - `GET  /api/modules` - every distinct `module_name` with its parsed form
///   and per-status task counts (the sidebar badges)
/// - `POST /api/modules/key` - build a module key for a date and subject

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use teamtask_shared::{
    auth::middleware::AuthContext,
    models::{
        task::{ModuleStatusCount, Task},
        user::User,
    },
    module_key::{build_module_key, normalize_username, parse_module_key, ModuleKey},
    stats::StatusBreakdown,
};
use validator::Validate;

/// All tasks sharing one `module_name`
#[derive(Debug, Serialize)]
pub struct ModuleGroup {
    pub label: String,
    pub module: ModuleKey,
    pub counts: StatusBreakdown,
    pub total: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BuildKeyRequest {
    pub date: NaiveDate,

    #[validate(length(min = 1, max = 200, message = "Subject must be 1-200 characters"))]
    pub subject: String,

    /// Defaults to the requester's display name
    #[validate(length(min = 1, max = 100, message = "User name must be 1-100 characters"))]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BuildKeyResponse {
    pub key: String,
    pub module: ModuleKey,
}

/// Folds per-(module, status) counts into one group per label
///
/// Well-formed keys come first, then legacy and malformed labels; each part
/// stays in label order.
fn group_modules(rows: Vec<ModuleStatusCount>) -> Vec<ModuleGroup> {
    let mut by_label: BTreeMap<String, StatusBreakdown> = BTreeMap::new();
    for row in rows {
        let count = u64::try_from(row.count).unwrap_or(0);
        by_label
            .entry(row.module_name)
            .or_default()
            .add(row.status, count);
    }

    let mut groups: Vec<ModuleGroup> = by_label
        .into_iter()
        .map(|(label, counts)| ModuleGroup {
            module: parse_module_key(&label),
            total: counts.total(),
            label,
            counts,
        })
        .collect();

    groups.sort_by_key(|g| !g.module.is_parsed());
    groups
}

pub async fn list_modules(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<ModuleGroup>>> {
    let rows = Task::module_status_counts(&state.db).await?;
    Ok(ApiResponse::ok("Modules retrieved", group_modules(rows)))
}

fn build_key_response(date: NaiveDate, user_name: &str, subject: &str) -> ApiResult<BuildKeyResponse> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(ApiError::invalid("subject", "Subject is required"));
    }
    if normalize_username(user_name).is_empty() {
        return Err(ApiError::invalid(
            "user_name",
            "User name must contain at least one letter or digit",
        ));
    }

    let key = build_module_key(date, user_name, subject);
    let module = parse_module_key(&key);

    Ok(BuildKeyResponse { key, module })
}

/// Build a module key
///
/// ```text
/// POST /api/modules/key
/// { "date": "2024-03-12", "subject": "Onboarding" }
/// ```
///
/// gives `"March-Week3-jane_doe-Onboarding"` for a requester named "Jane Doe".
pub async fn build_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<BuildKeyRequest>,
) -> ApiResult<ApiResponse<BuildKeyResponse>> {
    let user_name = match req.user_name {
        Some(name) => name,
        None => {
            User::find_by_id(&state.db, auth.user_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
                .name
        }
    };

    let response = build_key_response(req.date, &user_name, &req.subject)?;
    Ok(ApiResponse::ok("Module key built", response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Month;
    use teamtask_shared::models::task::TaskStatus;

    fn row(module_name: &str, status: TaskStatus, count: i64) -> ModuleStatusCount {
        ModuleStatusCount {
            module_name: module_name.to_string(),
            status,
            count,
        }
    }

    #[test]
    fn test_group_modules_sums_badges() {
        let groups = group_modules(vec![
            row("Misc", TaskStatus::Todo, 2),
            row("March-Week1-jane-Setup", TaskStatus::Done, 3),
            row("March-Week1-jane-Setup", TaskStatus::Todo, 1),
            row("March-Week2-jane-Review", TaskStatus::Review, 4),
            row("Smarch-Week1-jane-Oops", TaskStatus::Paused, 1),
        ]);

        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "March-Week1-jane-Setup",
                "March-Week2-jane-Review",
                "Misc",
                "Smarch-Week1-jane-Oops",
            ]
        );

        assert_eq!(groups[0].counts.done, 3);
        assert_eq!(groups[0].counts.todo, 1);
        assert_eq!(groups[0].total, 4);
        assert!(matches!(groups[2].module, ModuleKey::Legacy { .. }));
        assert!(matches!(groups[3].module, ModuleKey::Invalid { .. }));
    }

    #[test]
    fn test_build_key_response() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let response = build_key_response(date, "Jane Doe", "  Onboarding ").unwrap();

        assert_eq!(response.key, "March-Week3-jane_doe-Onboarding");
        assert_eq!(
            response.module,
            ModuleKey::Parsed {
                month: Month::March,
                week: 3,
                username: "jane_doe".to_string(),
                subject: "Onboarding".to_string(),
            }
        );
    }

    #[test]
    fn test_build_key_rejects_blank_inputs() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        assert!(build_key_response(date, "Jane", "   ").is_err());
        assert!(build_key_response(date, "!!!", "Setup").is_err());
    }
}
