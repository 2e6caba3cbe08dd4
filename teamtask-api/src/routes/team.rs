/// Team dashboard
///
/// `GET /api/team/dashboard` returns every user with their task statistics,
/// the whole-team totals, and every task with the requester's permission
/// flags. All users see all of it; only the flags differ.

use crate::{app::AppState, error::ApiResult, response::ApiResponse, routes::tasks::TaskWithPermissions};
use axum::{extract::State, Extension};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use teamtask_shared::{
    auth::middleware::AuthContext,
    models::{task::Task, user::User},
    stats::{compute_team_stats, compute_user_stats, TeamStats, UserTaskStats},
};

#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub user: User,
    pub stats: UserTaskStats,
}

#[derive(Debug, Serialize)]
pub struct TeamDashboard {
    pub members: Vec<MemberSummary>,
    pub team: TeamStats,
    pub tasks: Vec<TaskWithPermissions>,
}

fn build_dashboard(users: Vec<User>, tasks: Vec<Task>, auth: &AuthContext, today: NaiveDate) -> TeamDashboard {
    let members: Vec<MemberSummary> = users
        .into_iter()
        .map(|user| {
            let stats = compute_user_stats(user.id, &tasks, today);
            MemberSummary { user, stats }
        })
        .collect();

    let member_stats: Vec<UserTaskStats> = members.iter().map(|m| m.stats.clone()).collect();
    let team = compute_team_stats(&member_stats, &tasks, today);

    let tasks = tasks
        .into_iter()
        .map(|task| TaskWithPermissions::new(task, auth))
        .collect();

    TeamDashboard { members, team, tasks }
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<TeamDashboard>> {
    let users = User::list_all(&state.db).await?;
    let tasks = Task::list_all(&state.db).await?;

    let dashboard = build_dashboard(users, tasks, &auth, Utc::now().date_naive());

    Ok(ApiResponse::ok("Team dashboard retrieved", dashboard))
}
