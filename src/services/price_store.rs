//! Store access for items and their price history.
//!
//! Every write is idempotent: items are upserted on `(name, quality)` and price
//! points are insert-or-ignore on `(item_id, timestamp)`.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LikeExpr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Set,
};

use crate::entities::{items, price_history, prelude::*};

/// Maximum number of search results
pub const SEARCH_LIMIT: u64 = 5;

/// Outcome of a single price point insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Insert the item or, if `(name, quality)` already exists, refresh `updated_at`.
/// Returns the stored row (with its id) in a single statement.
pub async fn upsert_item<C: ConnectionTrait>(
    db: &C,
    name: &str,
    quality: i32,
) -> Result<items::Model, DbErr> {
    let item = items::ActiveModel {
        name: Set(name.to_string()),
        quality: Set(quality),
        ..Default::default()
    };

    Items::insert(item)
        .on_conflict(
            OnConflict::columns([items::Column::Name, items::Column::Quality])
                .value(items::Column::UpdatedAt, Expr::current_timestamp())
                .to_owned(),
        )
        .exec_with_returning(db)
        .await
}

/// Store one provider price point; an existing `(item_id, timestamp)` row is left untouched.
pub async fn insert_price_point<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
    price: Decimal,
    timestamp: i64,
) -> Result<InsertOutcome, DbErr> {
    let point = price_history::ActiveModel {
        item_id: Set(Some(item_id)),
        price: Set(price),
        timestamp: Set(timestamp),
        ..Default::default()
    };

    let rows = PriceHistory::insert(point)
        .on_conflict(
            OnConflict::columns([price_history::Column::ItemId, price_history::Column::Timestamp])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(if rows == 0 {
        InsertOutcome::Duplicate
    } else {
        InsertOutcome::Inserted
    })
}

/// Convert a provider price to the stored DECIMAL(10,2) representation.
///
/// Rounds the decimal the provider wrote (`1.005` becomes `1.01`), not the
/// binary expansion of the f64. Returns `None` for NaN and infinity.
pub fn to_stored_price(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Case-insensitive substring search on item names, ordered by name.
/// An empty query returns nothing without touching the store.
pub async fn search_items<C: ConnectionTrait>(
    db: &C,
    query: &str,
) -> Result<Vec<items::Model>, DbErr> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(vec![]);
    }

    let pattern = format!("%{}%", escape_like(query));

    Items::find()
        .filter(
            Expr::col((Items, items::Column::Name))
                .ilike(LikeExpr::new(pattern).escape('\\')),
        )
        .order_by(items::Column::Name, Order::Asc)
        .limit(SEARCH_LIMIT)
        .all(db)
        .await
}

pub async fn find_item<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
) -> Result<Option<items::Model>, DbErr> {
    Items::find_by_id(item_id).one(db).await
}

/// Stored price points for an item, oldest first
pub async fn item_history<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
) -> Result<Vec<price_history::Model>, DbErr> {
    PriceHistory::find()
        .filter(price_history::Column::ItemId.eq(item_id))
        .order_by(price_history::Column::Timestamp, Order::Asc)
        .all(db)
        .await
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
