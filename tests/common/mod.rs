#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::Router;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use tower::ServiceExt;

use tf2_dashboard_backend::services::backpack_tf::BackpackTfService;
use tf2_dashboard_backend::{AppState, routes};

pub const TEST_ORIGIN: &str = "http://localhost:3000";

// Tests run in parallel; only one of them may apply migrations at a time
static MIGRATION_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Set up test database connection
/// Uses TEST_DATABASE_URL; returns None when it is not set so DB tests can be skipped
pub async fn setup_test_db() -> Option<Result<DatabaseConnection, DbErr>> {
    let database_url = env::var("TEST_DATABASE_URL").ok()?;
    let _guard = MIGRATION_LOCK.lock().await;
    Some(tf2_dashboard_backend::db::connect(&database_url).await)
}

pub fn test_app(db: Arc<DatabaseConnection>, provider_url: &str) -> Router {
    let state = AppState {
        db,
        backpack: BackpackTfService::new("test_api_key".to_string(), provider_url.to_string()),
    };

    routes::app(state, HeaderValue::from_static(TEST_ORIGIN))
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

/// True when no statement reached the mock store.
/// Every router built on `db` must be dropped before calling this.
pub fn store_untouched(db: Arc<DatabaseConnection>) -> bool {
    let Ok(db) = Arc::try_unwrap(db) else {
        panic!("connection is still shared by a router");
    };
    db.into_transaction_log().is_empty()
}

/// Unique suffix so concurrent DB tests never touch each other's rows
pub fn unique_tag() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", std::process::id(), nanos)
}
