use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::backpack_tf::HistoryPoint;

/// Live exchange rates, built per request and never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencySnapshot {
    #[serde(rename = "keyPriceInRef")]
    pub key_price_in_ref: f64,
    #[serde(rename = "refPriceInUSD")]
    pub ref_price_in_usd: f64,
    #[serde(rename = "keyPriceInUSD")]
    pub key_price_in_usd: f64,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceHistoryQuery {
    pub item: Option<String>,
    pub quality: Option<String>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryResponse {
    pub item: String,
    pub points: Vec<PriceHistoryPoint>,
}

/// History window accepted by `/api/prices/history`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    SevenDays,
    #[default]
    ThirtyDays,
    NinetyDays,
    OneYear,
    ThreeYears,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTimeframe(pub String);

impl fmt::Display for UnknownTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown timeframe '{}', expected one of 7days, 30days, 90days, 1year, 3years",
            self.0
        )
    }
}

impl std::error::Error for UnknownTimeframe {}

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7days" => Ok(Timeframe::SevenDays),
            "30days" => Ok(Timeframe::ThirtyDays),
            "90days" => Ok(Timeframe::NinetyDays),
            "1year" => Ok(Timeframe::OneYear),
            "3years" => Ok(Timeframe::ThreeYears),
            other => Err(UnknownTimeframe(other.to_string())),
        }
    }
}

impl Timeframe {
    /// Missing or empty means the 30 day default; anything else must be a known value.
    pub fn from_param(param: Option<&str>) -> Result<Self, UnknownTimeframe> {
        match param.map(str::trim) {
            None | Some("") => Ok(Timeframe::default()),
            Some(value) => value.parse(),
        }
    }

    pub fn window(self) -> Duration {
        match self {
            Timeframe::SevenDays => Duration::days(7),
            Timeframe::ThirtyDays => Duration::days(30),
            Timeframe::NinetyDays => Duration::days(90),
            Timeframe::OneYear => Duration::days(365),
            Timeframe::ThreeYears => Duration::days(3 * 365),
        }
    }

    /// Oldest timestamp (seconds) kept when the window ends at `now`
    pub fn cutoff(self, now: DateTime<Utc>) -> i64 {
        (now - self.window()).timestamp()
    }
}

/// Keep points at or after the window start, preserving provider order
pub fn filter_points(
    points: Vec<HistoryPoint>,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Vec<PriceHistoryPoint> {
    let cutoff = timeframe.cutoff(now);

    points
        .into_iter()
        .filter(|p| p.timestamp >= cutoff)
        .map(|p| PriceHistoryPoint {
            timestamp: p.timestamp,
            value: p.value,
        })
        .collect()
}
