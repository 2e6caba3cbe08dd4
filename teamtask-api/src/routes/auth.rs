/// Authentication endpoints
///
/// - `POST /api/auth/register` - create an account, get tokens
/// - `POST /api/auth/login` - exchange credentials for tokens
/// - `POST /api/auth/refresh` - exchange a refresh token for a new access token
/// - `GET  /api/auth/me` - the authenticated user
///
/// The first account ever registered is made an admin; everyone after that
/// starts as a regular user.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use teamtask_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
        password,
    },
    models::user::{normalize_email, User},
};
use validator::Validate;

/// Seconds until an access token expires
const ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength after the length rule
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Tokens plus the account they belong to
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl AuthResponse {
    fn issue(user: User, secret: &str) -> ApiResult<Self> {
        let (access_token, refresh_token) = jwt::issue_token_pair(user.id, user.role, secret)?;

        Ok(Self {
            user,
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
/// { "name": "Jane Doe", "email": "jane@example.com", "password": "SecureP@ss123" }
/// ```
///
/// # Errors
///
/// - `400 validation_error`: bad name, email or weak password
/// - `409 conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid("password", message))?;

    let email = normalize_email(&req.email);
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;
    let user = User::register(&state.db, &req.name, &email, &password_hash).await?;

    let response = AuthResponse::issue(user, state.jwt_secret())?;
    Ok(ApiResponse::created("User registered", response))
}

/// Login with email and password
///
/// Unknown email and wrong password give the same `401` so accounts can't be
/// enumerated.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let response = AuthResponse::issue(user, state.jwt_secret())?;
    Ok(ApiResponse::ok("Login successful", response))
}

/// Exchange a refresh token for a new access token
///
/// The role is re-read from the database, so a promotion or demotion takes
/// effect on the next refresh rather than when the refresh token expires.
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let access_token = jwt::create_token(
        &Claims::new(user.id, user.role, TokenType::Access),
        state.jwt_secret(),
    )?;

    Ok(ApiResponse::ok(
        "Token refreshed",
        RefreshResponse {
            access_token,
            token_type: "Bearer",
            expires_in: ACCESS_TOKEN_TTL_SECONDS,
        },
    ))
}

/// The authenticated user's account
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("User retrieved", user))
}
