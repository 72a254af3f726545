use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::handlers::{health, items, prices};

/// API routes without middleware
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/prices", get(prices::get_prices))
        .route("/api/prices/history", get(prices::get_price_history))
        .route("/api/items/search", get(items::search_items))
        .route("/api/items/{id}", get(items::get_item))
        .route("/api/items/{id}/history", get(items::get_item_history))
        .with_state(state)
}

/// CORS for the single dashboard origin, with credentials
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn app(state: AppState, cors_origin: HeaderValue) -> Router {
    api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
}
