use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use restbucks_orders::api::{self, AppState};
use restbucks_orders::config::AppConfig;
use restbucks_orders::metrics::Metrics;
use restbucks_orders::persistence::{
    self, InMemoryOrderRepository, InMemoryUserRepository, OrderRepository, PgOrderRepository,
    PgUserRepository, UserRepository,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,restbucks_orders=debug")),
        )
        .init();

    tracing::info!("☕ Starting Restbucks order service");

    let config = AppConfig::from_env()?;

    // === 1. Repositories: PostgreSQL when configured, in-memory otherwise ===
    let (orders, users): (Arc<dyn OrderRepository>, Arc<dyn UserRepository>) =
        match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to PostgreSQL...");
                let pool = persistence::connect(url, config.db_max_connections).await?;
                (
                    Arc::new(PgOrderRepository::new(pool.clone())),
                    Arc::new(PgUserRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory repositories");
                (
                    Arc::new(InMemoryOrderRepository::new()),
                    Arc::new(InMemoryUserRepository::new()),
                )
            }
        };

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metric families",
        metrics.registry().gather().len()
    );

    // === 3. HTTP API ===
    let state = AppState::new(orders, users, metrics, config.paging.clone());
    api::run(&config, state).await?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}
