use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};

use crate::error::UpstreamError;
use crate::services::backpack_tf::BackpackTfService;
use crate::services::price_store::{self, InsertOutcome};

/// The catalog does not expose per-variant qualities, so every item is stored
/// under a single quality code.
pub const CATALOG_QUALITY: i32 = 0;

/// Counters for one catalog run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub items_seen: usize,
    pub items_upserted: usize,
    pub item_failures: usize,
    pub history_failures: usize,
    pub points_inserted: usize,
    pub points_duplicate: usize,
    pub points_failed: usize,
}

/// Counters for one item's history
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Run `sync_catalog` on a fixed schedule inside the server process.
pub async fn start_catalog_sync_job(
    db: Arc<DatabaseConnection>,
    backpack: BackpackTfService,
    every: Duration,
    pacing: Duration,
) {
    tokio::spawn(async move {
        let mut interval = sync_schedule(every);

        loop {
            interval.tick().await;
            tracing::info!("Starting scheduled catalog sync");

            if let Err(e) = sync_catalog(db.as_ref(), &backpack, pacing).await {
                tracing::error!("Failed to sync catalog: {}", e);
            }
        }
    });
}

/// A run can outlast `every`; missed ticks are delayed, never replayed back to back.
fn sync_schedule(every: Duration) -> Interval {
    let mut schedule = interval(every);
    schedule.set_missed_tick_behavior(MissedTickBehavior::Delay);
    schedule
}

/// Pull the full catalog and every item's price history into the store.
///
/// Items are processed one at a time with `pacing` between them. Only a failure
/// to obtain the catalog itself aborts the run; per-item failures are logged and
/// counted.
pub async fn sync_catalog(
    db: &DatabaseConnection,
    backpack: &BackpackTfService,
    pacing: Duration,
) -> Result<SyncReport, UpstreamError> {
    let started = Instant::now();

    let catalog = backpack.fetch_catalog().await.inspect_err(|e| {
        if let Some(body) = e.body() {
            tracing::error!(error = %e, body = %body, "Catalog request failed");
        }
    })?;

    let total = catalog.len();
    let mut report = SyncReport {
        items_seen: total,
        ..Default::default()
    };

    tracing::info!("Syncing {} catalog items", total);

    for (index, entry) in catalog.iter().enumerate() {
        let progress = index + 1;

        let item = match price_store::upsert_item(db, &entry.name, CATALOG_QUALITY).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(item = %entry.name, error = %e, "Failed to upsert item");
                report.item_failures += 1;
                continue;
            }
        };
        report.items_upserted += 1;

        match sync_item_history(db, backpack, item.id, &item.name, item.quality).await {
            Ok(history) => {
                report.points_inserted += history.inserted;
                report.points_duplicate += history.duplicates;
                report.points_failed += history.failed;
                tracing::debug!(
                    item = %item.name,
                    inserted = history.inserted,
                    duplicates = history.duplicates,
                    "[{}/{}] History synced",
                    progress,
                    total
                );
            }
            Err(e) => {
                tracing::warn!(item = %item.name, error = %e, "Failed to sync price history");
                report.history_failures += 1;
            }
        }

        if progress % 100 == 0 {
            tracing::info!(
                "Progress: {}/{} items | New points: {} | Failures: {}",
                progress,
                total,
                report.points_inserted,
                report.item_failures + report.history_failures
            );
        }

        if progress < total && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }

    tracing::info!(
        elapsed_secs = started.elapsed().as_secs(),
        "Catalog sync complete: {} items upserted, {} item failures, {} history failures, {} new points, {} duplicate points, {} failed points",
        report.items_upserted,
        report.item_failures,
        report.history_failures,
        report.points_inserted,
        report.points_duplicate,
        report.points_failed
    );

    Ok(report)
}

/// Fetch one item's price history and insert every point not already stored.
///
/// Existing `(item_id, timestamp)` rows are never modified. Failed inserts are
/// logged and skipped.
pub async fn sync_item_history(
    db: &DatabaseConnection,
    backpack: &BackpackTfService,
    item_id: i32,
    item_name: &str,
    quality: i32,
) -> Result<HistoryReport, UpstreamError> {
    let points = backpack.fetch_price_history(item_name, quality).await?;

    let mut report = HistoryReport::default();

    for point in points {
        let Some(price) = price_store::to_stored_price(point.value) else {
            tracing::warn!(
                item = %item_name,
                timestamp = point.timestamp,
                value = point.value,
                "Unrepresentable price, skipping point"
            );
            report.failed += 1;
            continue;
        };

        match price_store::insert_price_point(db, item_id, price, point.timestamp).await {
            Ok(InsertOutcome::Inserted) => report.inserted += 1,
            Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                tracing::warn!(
                    item = %item_name,
                    timestamp = point.timestamp,
                    error = %e,
                    "Failed to insert price point"
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
