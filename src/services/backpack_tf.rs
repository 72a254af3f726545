//! backpack.tf API client
//!
//! Covers the three endpoints the dashboard needs:
//! - `IGetCurrencies/v1`: key/refined exchange rates
//! - `IGetPrices/v4`: the priced item catalog
//! - `IGetPriceHistory/v1`: price history for one item and quality
//!
//! backpack.tf reports failures inside the body (`response.success != 1`), so the
//! HTTP status is only logged and every body goes through the success check.

use reqwest::Client;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::UpstreamError;

/// Team Fortress 2
const APP_ID: &str = "440";

const CURRENCIES_ENDPOINT: &str = "IGetCurrencies/v1";
const CATALOG_ENDPOINT: &str = "IGetPrices/v4";
const HISTORY_ENDPOINT: &str = "IGetPriceHistory/v1";

/// Timeout for currency and history requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The full catalog is large and slow to generate
const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Base delay between retries (doubled on every attempt)
const RETRY_BASE_DELAY_MS: u64 = 1000;

#[derive(Clone)]
pub struct BackpackTfService {
    client: Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
    catalog_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

/// Current key/refined exchange rates
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRates {
    pub key_price_in_ref: f64,
    pub ref_price_in_usd: f64,
    pub key_price_in_usd: f64,
}

/// One entry of the price catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HistoryPoint {
    pub value: f64,
    pub timestamp: i64,
}

// backpack.tf wraps every payload in {"response": {...}}
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct Status {
    success: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    currencies: Currencies,
}

#[derive(Debug, Deserialize)]
struct Currencies {
    keys: Currency,
    refined: Currency,
}

#[derive(Debug, Deserialize)]
struct Currency {
    price: CurrencyPrice,
}

#[derive(Debug, Deserialize)]
struct CurrencyPrice {
    value: f64,
    #[serde(default)]
    value_raw: Option<f64>,
}

impl CurrencyPrice {
    fn raw(&self) -> f64 {
        self.value_raw.unwrap_or(self.value)
    }
}

// Only the item names are read; per-quality prices sit under provider-specific keys
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    items: BTreeMap<String, IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<HistoryPoint>,
}

impl BackpackTfService {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: REQUEST_TIMEOUT,
            catalog_timeout: CATALOG_TIMEOUT,
            max_retries: 0,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Retry transient failures (connect errors, timeouts) up to `max_retries` times
    /// with exponential backoff. Zero keeps single-attempt behaviour.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, catalog_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.catalog_timeout = catalog_timeout;
        self
    }

    pub async fn fetch_currencies(&self) -> Result<CurrencyRates, UpstreamError> {
        tracing::debug!("Fetching currencies from backpack.tf");

        let data: CurrenciesResponse = self
            .get(CURRENCIES_ENDPOINT, &[("raw", "1")], self.request_timeout)
            .await?;

        let keys = &data.currencies.keys.price;
        let refined = &data.currencies.refined.price;

        Ok(CurrencyRates {
            key_price_in_ref: keys.value,
            ref_price_in_usd: refined.raw(),
            key_price_in_usd: keys.raw(),
        })
    }

    /// Fetch the priced item catalog, ordered by item name
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        tracing::info!("Fetching item catalog from backpack.tf");

        let data: CatalogResponse = self.get(CATALOG_ENDPOINT, &[], self.catalog_timeout).await?;

        let items: Vec<CatalogItem> = data
            .items
            .into_keys()
            .map(|name| CatalogItem { name })
            .collect();

        tracing::info!("Fetched {} catalog items from backpack.tf", items.len());

        Ok(items)
    }

    pub async fn fetch_price_history(
        &self,
        item_name: &str,
        quality: i32,
    ) -> Result<Vec<HistoryPoint>, UpstreamError> {
        let quality = quality.to_string();

        let data: HistoryResponse = self
            .get(
                HISTORY_ENDPOINT,
                &[("item", item_name), ("quality", quality.as_str())],
                self.request_timeout,
            )
            .await?;

        tracing::debug!(
            item = %item_name,
            quality = %quality,
            points = data.history.len(),
            "Fetched price history"
        );

        Ok(data.history)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, UpstreamError> {
        let body = self.fetch_body_with_retry(endpoint, params, timeout).await?;
        parse_response(endpoint, body)
    }

    async fn fetch_body_with_retry(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String, UpstreamError> {
        let mut attempt: u32 = 0;

        loop {
            match self.fetch_body(endpoint, params, timeout).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        endpoint = endpoint,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient backpack.tf failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_body(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[("key", self.api_key.as_str()), ("appid", APP_ID)])
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| UpstreamError::Request { endpoint, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::Request { endpoint, source })?;

        tracing::debug!(endpoint = endpoint, status = %status, body = %body, "Raw backpack.tf response");

        Ok(body)
    }
}

/// Check the embedded success flag, then decode the typed payload
fn parse_response<T: DeserializeOwned>(
    endpoint: &'static str,
    body: String,
) -> Result<T, UpstreamError> {
    let status: Envelope<Status> = match serde_json::from_str(&body) {
        Ok(status) => status,
        Err(source) => return Err(UpstreamError::Decode { endpoint, source, body }),
    };

    if status.response.success != 1 {
        let message = status
            .response
            .message
            .unwrap_or_else(|| format!("success = {}", status.response.success));
        return Err(UpstreamError::Unsuccessful {
            endpoint,
            message,
            body,
        });
    }

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => Ok(envelope.response),
        Err(source) => Err(UpstreamError::Decode { endpoint, source, body }),
    }
}
