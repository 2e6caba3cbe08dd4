/// Database layer
///
/// - [`pool`]: PostgreSQL connection pool with a startup health check
/// - [`migrations`]: embedded schema migrations from `migrations/`
///
/// Models live in [`crate::models`] and take a `&PgPool` per call.
///
/// # Example
///
/// ```no_run
/// use teamtask_shared::db::pool::{create_pool, DatabaseConfig};
/// use teamtask_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
