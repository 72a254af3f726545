//! One-shot catalog sync, meant to be run from cron or a systemd timer.

use std::time::Instant;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tf2_dashboard_backend::config::Config;
use tf2_dashboard_backend::db;
use tf2_dashboard_backend::jobs::catalog_sync::sync_catalog;
use tf2_dashboard_backend::services::backpack_tf::BackpackTfService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let db = db::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let backpack = BackpackTfService::new(config.api_key, config.base_url).with_retries(
        config.provider_max_retries,
        std::time::Duration::from_secs(1),
    );

    tracing::info!("Starting TF2 item price sync...");
    let started = Instant::now();

    let report = sync_catalog(&db, &backpack, config.sync_pacing)
        .await
        .context("Catalog sync aborted")?;

    tracing::info!(
        "Sync finished in {:.1}s ({} items, {} new points)",
        started.elapsed().as_secs_f64(),
        report.items_upserted,
        report.points_inserted
    );

    Ok(())
}
