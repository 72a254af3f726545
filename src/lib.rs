// src/lib.rs

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use services::backpack_tf::BackpackTfService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub backpack: BackpackTfService,
}

pub mod entities {
    pub mod prelude;
    pub mod items;
    pub mod price_history;
}

pub mod services {
    pub mod backpack_tf;
    pub mod price_store;
}

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod routes;
