//! # TeamTask API Server
//!
//! Loads configuration, connects to PostgreSQL, applies migrations and serves
//! the JSON API until Ctrl-C or SIGTERM.
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/teamtask JWT_SECRET=... cargo run -p teamtask-api
//! ```

use anyhow::Context;
use teamtask_api::{
    app::{build_router, AppState},
    config::Config,
    telemetry,
};
use teamtask_shared::db::{migrations::run_migrations, pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(config.log_format);

    tracing::info!("TeamTask API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let db = pool::create_pool(config.pool_config())
        .await
        .context("failed to connect to the database")?;
    run_migrations(&db).await.context("failed to run migrations")?;

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
