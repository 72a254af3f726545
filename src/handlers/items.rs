use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::error::AppError;
use crate::models::items::{ItemSummary, SearchQuery, StoredPricePoint};
use crate::services::price_store;

pub async fn search_items(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ItemSummary>>, AppError> {
    let query = params.q.unwrap_or_default();

    let items = price_store::search_items(state.db.as_ref(), &query).await?;

    Ok(Json(items.into_iter().map(ItemSummary::from).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemSummary>, AppError> {
    let item_id = parse_item_id(&id)?;

    let item = price_store::find_item(state.db.as_ref(), item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    Ok(Json(item.into()))
}

/// Locally stored history, oldest first. Unknown ids yield an empty list.
pub async fn get_item_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredPricePoint>>, AppError> {
    let item_id = parse_item_id(&id)?;

    let points = price_store::item_history(state.db.as_ref(), item_id).await?;

    Ok(Json(points.into_iter().map(StoredPricePoint::from).collect()))
}

fn parse_item_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::Validation(format!("item id must be an integer, got '{}'", raw)))
}
