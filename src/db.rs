use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Open the process-wide pool and bring the schema up to date.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(25)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .max_lifetime(Duration::from_secs(300))
        .sqlx_logging(false);

    tracing::info!("Connecting to database...");
    let db = Database::connect(options).await?;
    db.ping().await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    Ok(db)
}
