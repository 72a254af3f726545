use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::entities::{items, price_history};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i32,
    pub name: String,
    pub quality: i32,
}

impl From<items::Model> for ItemSummary {
    fn from(item: items::Model) -> Self {
        Self {
            id: item.id,
            name: item.name,
            quality: item.quality,
        }
    }
}

/// A price point as stored locally (DECIMAL(10,2) rendered as a JSON number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPricePoint {
    pub price: f64,
    pub timestamp: i64,
}

impl From<price_history::Model> for StoredPricePoint {
    fn from(point: price_history::Model) -> Self {
        Self {
            price: point.price.to_f64().unwrap_or(0.0),
            timestamp: point.timestamp,
        }
    }
}
