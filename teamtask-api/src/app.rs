/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use teamtask_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    middleware::security::SecurityHeadersLayer,
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use teamtask_shared::{
    auth::middleware::{jwt_auth_middleware, AuthContext, AuthError},
    models::user::User,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                              public
/// /api/auth/{register,login,refresh}   public
/// /api/auth/me                         bearer token
/// /api/users, /api/tasks, /api/team,
/// /api/projects, /api/time-entries,
/// /api/modules                         bearer token
/// ```
///
/// Layers, outermost first: security headers, CORS, compression, tracing.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/users", get(routes::users::list_users))
        .route("/users/:id/role", put(routes::users::update_role))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/team", get(routes::tasks::team_tasks))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/transitions", get(routes::tasks::task_transitions))
        .route("/team/dashboard", get(routes::team::dashboard))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/projects/counts", get(routes::projects::project_counts))
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/time-entries",
            get(routes::time_entries::list_entries).post(routes::time_entries::create_entry),
        )
        .route("/time-entries/summary", get(routes::time_entries::summary))
        .route(
            "/time-entries/:id",
            put(routes::time_entries::update_entry).delete(routes::time_entries::delete_entry),
        )
        .route("/modules", get(routes::modules::list_modules))
        .route("/modules/key", post(routes::modules::build_key))
        .route_layer(middleware::from_fn_with_state(state.clone(), current_role_layer))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let api = public.merge(protected);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allows_any() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the bearer token and injects `AuthContext` into the request
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.jwt_secret().to_string(), req, next).await
}

/// Re-reads the stored role behind an admin claim
///
/// Tokens keep the role they were issued with, so a demoted admin's token
/// would otherwise keep admin rights until it expires. User claims grant
/// nothing beyond ownership and are taken as is.
async fn current_role(db: &PgPool, auth: AuthContext) -> ApiResult<AuthContext> {
    if !auth.is_admin() {
        return Ok(auth);
    }

    let user = User::find_by_id(db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    if user.role != auth.role {
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Token role is stale");
    }

    Ok(AuthContext::new(user.id, user.role))
}

async fn current_role_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(auth) = req.extensions().get::<AuthContext>().copied() {
        let auth = current_role(&state.db, auth).await?;
        req.extensions_mut().insert(auth);
    }

    Ok(next.run(req).await)
}
