use anyhow::Context;
use rosterlink::bootstrap;
use rosterlink::config::Config;
use rosterlink::infrastructure::http::router::build_router;
use rosterlink::infrastructure::observability;
use rosterlink::infrastructure::persistence::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    let _observability = observability::init(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize observability: {}", e))?;
    tracing::info!("Configuration loaded");

    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    db.run_migrations()
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let state = bootstrap::build_app_state(db, &config)?;
    let app = build_router(state);

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
