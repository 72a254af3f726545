//! Catalog sync against a real PostgreSQL database.
//!
//! Set TEST_DATABASE_URL to run these; they are skipped otherwise. Every test
//! uses item names carrying a unique tag so runs never collide.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use tokio::time::Duration;
use wiremock::matchers::{path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tf2_dashboard_backend::entities::{items, price_history, prelude::*};
use tf2_dashboard_backend::jobs::catalog_sync::{CATALOG_QUALITY, sync_catalog};
use tf2_dashboard_backend::services::backpack_tf::BackpackTfService;
use tf2_dashboard_backend::services::price_store::{self, SEARCH_LIMIT};

use crate::common::{get, setup_test_db, test_app, unique_tag};

macro_rules! require_db {
    () => {
        match setup_test_db().await {
            Some(db) => db.expect("TEST_DATABASE_URL is set but the database is unreachable"),
            None => {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

async fn mount_catalog(server: &MockServer, names: &[String]) {
    let items: serde_json::Map<String, serde_json::Value> = names
        .iter()
        .map(|n| (n.clone(), json!({"defindex": [5021]})))
        .collect();

    Mock::given(path("/IGetPrices/v4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"success": 1, "items": items}
        })))
        .mount(server)
        .await;
}

async fn mount_history(server: &MockServer, name: &str, body: serde_json::Value) {
    Mock::given(path("/IGetPriceHistory/v1"))
        .and(query_param("item", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn stored_item(db: &DatabaseConnection, name: &str) -> items::Model {
    Items::find()
        .filter(items::Column::Name.eq(name))
        .filter(items::Column::Quality.eq(CATALOG_QUALITY))
        .one(db)
        .await
        .unwrap()
        .expect("item should be stored")
}

async fn point_count(db: &DatabaseConnection, item_id: i32) -> u64 {
    PriceHistory::find()
        .filter(price_history::Column::ItemId.eq(item_id))
        .count(db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sync_twice_is_idempotent() {
    let db = require_db!();
    let tag = unique_tag();
    let alpha = format!("Alpha {}", tag);
    let bravo = format!("Bravo {}", tag);

    let server = MockServer::start().await;
    mount_catalog(&server, &[alpha.clone(), bravo.clone()]).await;
    mount_history(
        &server,
        &alpha,
        json!({"response": {"success": 1, "history": [
            {"value": 1.0, "timestamp": 100},
            {"value": 1.25, "timestamp": 200}
        ]}}),
    )
    .await;
    mount_history(
        &server,
        &bravo,
        json!({"response": {"success": 1, "history": [{"value": 70.5, "timestamp": 300}]}}),
    )
    .await;

    let backpack = BackpackTfService::new("k".to_string(), server.uri());

    let first = sync_catalog(&db, &backpack, Duration::ZERO).await.unwrap();
    assert_eq!(first.points_inserted, 3);
    assert_eq!(first.points_duplicate, 0);

    let alpha_before = stored_item(&db, &alpha).await;
    let bravo_before = stored_item(&db, &bravo).await;

    let second = sync_catalog(&db, &backpack, Duration::ZERO).await.unwrap();
    assert_eq!(second.points_inserted, 0);
    assert_eq!(second.points_duplicate, 3);

    let alpha_after = stored_item(&db, &alpha).await;
    let bravo_after = stored_item(&db, &bravo).await;

    // Same rows, only updated_at may move
    assert_eq!(alpha_before.id, alpha_after.id);
    assert_eq!(bravo_before.id, bravo_after.id);
    assert_eq!(alpha_before.created_at, alpha_after.created_at);
    assert!(alpha_after.updated_at >= alpha_before.updated_at);

    assert_eq!(point_count(&db, alpha_after.id).await, 2);
    assert_eq!(point_count(&db, bravo_after.id).await, 1);

    let item_rows = Items::find()
        .filter(items::Column::Name.is_in([alpha.clone(), bravo.clone()]))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(item_rows, 2);
}

#[tokio::test]
async fn test_repeated_timestamp_stored_once() {
    let db = require_db!();
    let name = format!("Charlie {}", unique_tag());

    let server = MockServer::start().await;
    mount_catalog(&server, &[name.clone()]).await;
    mount_history(
        &server,
        &name,
        json!({"response": {"success": 1, "history": [
            {"value": 2.0, "timestamp": 500},
            {"value": 9.99, "timestamp": 500}
        ]}}),
    )
    .await;

    let backpack = BackpackTfService::new("k".to_string(), server.uri());
    let report = sync_catalog(&db, &backpack, Duration::ZERO).await.unwrap();

    assert_eq!(report.points_inserted, 1);
    assert_eq!(report.points_duplicate, 1);

    let item = stored_item(&db, &name).await;
    let points = PriceHistory::find()
        .filter(price_history::Column::ItemId.eq(item.id))
        .all(&db)
        .await
        .unwrap();

    // First observation wins, never overwritten
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].price.to_string(), "2.00");
}

#[tokio::test]
async fn test_failed_history_does_not_block_other_items() {
    let db = require_db!();
    let tag = unique_tag();
    let broken = format!("Delta {}", tag);
    let healthy = format!("Echo {}", tag);

    let server = MockServer::start().await;
    mount_catalog(&server, &[broken.clone(), healthy.clone()]).await;
    mount_history(
        &server,
        &broken,
        json!({"response": {"success": 0, "message": "No price history"}}),
    )
    .await;
    mount_history(
        &server,
        &healthy,
        json!({"response": {"success": 1, "history": [
            {"value": 3.0, "timestamp": 100},
            {"value": 3.5, "timestamp": 200}
        ]}}),
    )
    .await;

    let backpack = BackpackTfService::new("k".to_string(), server.uri());
    let report = sync_catalog(&db, &backpack, Duration::ZERO).await.unwrap();

    assert_eq!(report.history_failures, 1);
    assert_eq!(report.items_upserted, 2);

    let healthy_item = stored_item(&db, &healthy).await;
    assert_eq!(point_count(&db, healthy_item.id).await, 2);
}

#[tokio::test]
async fn test_stored_history_and_search_endpoints() {
    let db = require_db!();
    let tag = unique_tag();
    let name = format!("Foxtrot Key {}", tag);

    let server = MockServer::start().await;
    mount_catalog(&server, &[name.clone()]).await;
    mount_history(
        &server,
        &name,
        json!({"response": {"success": 1, "history": [
            {"value": 4.5, "timestamp": 300},
            {"value": 4.0, "timestamp": 100}
        ]}}),
    )
    .await;

    let backpack = BackpackTfService::new("k".to_string(), server.uri());
    sync_catalog(&db, &backpack, Duration::ZERO).await.unwrap();
    let item = stored_item(&db, &name).await;

    let app = test_app(Arc::new(db), &server.uri());

    let (status, json) = get(app.clone(), &format!("/api/items/{}/history", item.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([
            {"price": 4.0, "timestamp": 100},
            {"price": 4.5, "timestamp": 300}
        ])
    );

    let (status, json) = get(app.clone(), &format!("/api/items/search?q=FOXTROT%20KEY%20{}", tag)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([{"id": item.id, "name": name, "quality": 0}]));

    let (status, json) = get(app.clone(), "/api/items/search?q=key").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();
    assert!(!names.is_empty() && names.len() <= 5);
    assert!(names.iter().all(|n| n.to_lowercase().contains("key")));

    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_search_limits_and_orders_by_name() {
    let db = require_db!();
    let tag = unique_tag();

    // Distinct leading letters keep the order independent of the collation
    let names = [
        format!("F gamma KEY {}", tag),
        format!("B Gamma key {}", tag),
        format!("D GAMMA Key {}", tag),
        format!("A gamma key {}", tag),
        format!("E Gamma KEY {}", tag),
        format!("C gAmMa kEy {}", tag),
    ];
    for name in &names {
        price_store::upsert_item(&db, name, CATALOG_QUALITY).await.unwrap();
    }

    let app = test_app(Arc::new(db), "http://127.0.0.1:9");
    let (status, json) = get(app, &format!("/api/items/search?q=GAMMA%20key%20{}", tag)).await;
    assert_eq!(status, StatusCode::OK);

    let found: Vec<String> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(found.len(), SEARCH_LIMIT as usize);
    assert_eq!(
        found,
        vec![
            format!("A gamma key {}", tag),
            format!("B Gamma key {}", tag),
            format!("C gAmMa kEy {}", tag),
            format!("D GAMMA Key {}", tag),
            format!("E Gamma KEY {}", tag),
        ]
    );
}
