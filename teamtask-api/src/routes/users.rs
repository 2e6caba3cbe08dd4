/// User directory
///
/// - `GET /api/users` - every account, for assignee pickers
/// - `PUT /api/users/:id/role` - change a user's role (admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Id, ValidatedJson},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use serde::Deserialize;
use teamtask_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::user::{UpdateUser, User, UserRole},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<User>>> {
    let users = User::list_all(&state.db).await?;
    Ok(ApiResponse::ok("Users retrieved", users))
}

/// Admins can't change their own role, so there is always at least one admin.
fn check_role_change(auth: &AuthContext, target: Uuid) -> ApiResult<()> {
    require_admin(auth)?;

    if auth.user_id == target {
        return Err(ApiError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    Ok(())
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Id(user_id): Id,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<User>> {
    check_role_change(&auth, user_id)?;

    let user = User::update(
        &state.db,
        user_id,
        UpdateUser {
            role: Some(req.role),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        role = user.role.as_str(),
        changed_by = %auth.user_id,
        "User role changed"
    );

    Ok(ApiResponse::ok("Role updated", user))
}
