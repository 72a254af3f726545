use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{SecondsFormat, Utc};

use crate::AppState;
use crate::error::AppError;
use crate::models::prices::{
    CurrencySnapshot, PriceHistoryQuery, PriceHistoryResponse, Timeframe, filter_points,
};

/// Quality requested when the caller does not name one (Unique)
pub const DEFAULT_QUALITY: i32 = 6;

/// Live key/refined rates straight from backpack.tf (no caching)
pub async fn get_prices(State(state): State<AppState>) -> Result<Json<CurrencySnapshot>, AppError> {
    let rates = state.backpack.fetch_currencies().await?;

    Ok(Json(CurrencySnapshot {
        key_price_in_ref: rates.key_price_in_ref,
        ref_price_in_usd: rates.ref_price_in_usd,
        key_price_in_usd: rates.key_price_in_usd,
        last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

/// Provider price history for one item, trimmed to the requested timeframe.
/// Reads backpack.tf directly, not the local store.
pub async fn get_price_history(
    State(state): State<AppState>,
    Query(params): Query<PriceHistoryQuery>,
) -> Result<Json<PriceHistoryResponse>, AppError> {
    let item = params
        .item
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("item is required".to_string()))?
        .to_string();

    let quality = match params.quality.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_QUALITY,
        Some(q) => q
            .parse::<i32>()
            .map_err(|_| AppError::Validation(format!("quality must be an integer, got '{}'", q)))?,
    };

    let timeframe = Timeframe::from_param(params.timeframe.as_deref())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let history = state.backpack.fetch_price_history(&item, quality).await?;
    let points = filter_points(history, timeframe, Utc::now());

    tracing::debug!(
        item = %item,
        quality = quality,
        timeframe = ?timeframe,
        points = points.len(),
        "Serving price history"
    );

    Ok(Json(PriceHistoryResponse { item, points }))
}
