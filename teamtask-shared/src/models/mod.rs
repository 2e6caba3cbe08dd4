/// Database models for TeamTask
///
/// Each model owns its SQL and exposes async associated functions taking a `&PgPool`.
///
/// # Models
///
/// - `user`: Accounts, roles and credentials
/// - `task`: Tasks, their status machine and priorities
/// - `project`: Projects with derived progress
/// - `time_entry`: Hours logged by a user against a task
///
/// # Example
///
/// ```no_run
/// use teamtask_shared::models::user::{User, CreateUser, UserRole};
/// use teamtask_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::User,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod project;
pub mod task;
pub mod time_entry;
pub mod user;
