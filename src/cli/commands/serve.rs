use anyhow::Context;

use crate::cli::commands::seed::seed_demo_data;
use crate::config::config;
use crate::database::{DatabaseManager, Stores};
use crate::state::AppState;

pub async fn handle(memory: bool, seed: bool) -> anyhow::Result<()> {
    let config = config();
    tracing::info!("Starting SaaS platform API in {:?} mode", config.environment);
    config.check_serve(memory, seed)?;

    let stores = if memory {
        tracing::warn!("Using in-memory stores; data is lost on exit");
        Stores::in_memory()
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        Stores::postgres(pool)
    };

    if seed {
        let report = seed_demo_data(&stores).await?;
        tracing::info!(?report, "Demo data loaded");
    }

    let state = AppState::new(config.clone(), stores).context("cannot build application state")?;
    let app = crate::app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
