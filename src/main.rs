use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tf2_dashboard_backend::config::Config;
use tf2_dashboard_backend::jobs::catalog_sync::start_catalog_sync_job;
use tf2_dashboard_backend::services::backpack_tf::BackpackTfService;
use tf2_dashboard_backend::{AppState, db, routes};

/// Base delay for provider retries in the long-running server
const RETRY_BASE_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tf2_dashboard_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let db = Arc::new(
        db::connect(&config.database_url)
            .await
            .context("Failed to connect to database")?,
    );

    let backpack = BackpackTfService::new(config.api_key.clone(), config.base_url.clone())
        .with_retries(config.provider_max_retries, RETRY_BASE_DELAY);

    if let Some(every) = config.sync_interval {
        tracing::info!("Scheduling catalog sync every {}s", every.as_secs());
        start_catalog_sync_job(db.clone(), backpack.clone(), every, config.sync_pacing).await;
    }

    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("Invalid CORS_ORIGIN '{}'", config.cors_origin))?;

    let state = AppState { db, backpack };
    let app = routes::app(state, cors_origin);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
