//! Currency conversion via exchangerate-api.com
//!
//! Uses the v6 pair endpoint:
//! `GET {base}/{key}/pair/{from}/{to}/{amount}`
//!
//! # Configuration
//!
//! - `EXCHANGE_RATE_API_KEY`: API key (required for cross-currency conversion)

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Currency;

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Per-request limit for exchange-rate calls
pub const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CurrencyConverter {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    #[serde(default)]
    conversion_result: Option<Decimal>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

impl CurrencyConverter {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_EXCHANGE_RATE_URL, api_key)
    }

    /// Point the converter at a different host (used by tests)
    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("EXCHANGE_RATE_API_KEY").ok())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Convert `amount` from one currency to another
    ///
    /// Same-currency conversion returns the amount unchanged without a
    /// network call.
    pub async fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            return Ok(amount);
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration("EXCHANGE_RATE_API_KEY is not set".to_string())
        })?;

        let url = format!(
            "{}/{}/pair/{}/{}/{}",
            self.base_url, api_key, from, to, amount
        );
        debug!(%from, %to, %amount, "Requesting exchange rate");

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::from_request(e, "Exchange rate API"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Exchange rate API error {}: {}",
                status, body
            )));
        }

        let pair: PairResponse = response
            .json()
            .await
            .map_err(|e| Error::from_request(e, "Exchange rate API"))?;
        if pair.result != "success" {
            return Err(Error::Upstream(format!(
                "Exchange rate API returned '{}': {}",
                pair.result,
                pair.error_type.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        pair.conversion_result.ok_or_else(|| {
            Error::Upstream("Exchange rate API response missing conversion_result".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::get, Json, Router};
    use serde_json::{json, Value};

    async fn start_rate_server() -> String {
        async fn pair(
            Path((_key, from, to, amount)): Path<(String, String, String, String)>,
        ) -> Json<Value> {
            if to == "CHF" {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
            if from == "XXX" || to == "JPY" {
                return Json(json!({"result": "error", "error-type": "unsupported-code"}));
            }
            let amount: f64 = amount.parse().unwrap();
            Json(json!({"result": "success", "conversion_result": amount * 0.5}))
        }

        let app = Router::new().route("/v6/:key/pair/:from/:to/:amount", get(pair));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v6", addr)
    }

    #[tokio::test]
    async fn test_same_currency_is_identity() {
        let converter = CurrencyConverter::new(None);
        let amount = Decimal::new(1234, 2);
        let converted = converter
            .convert(amount, Currency::Usd, Currency::Usd)
            .await
            .unwrap();
        assert_eq!(converted, amount);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let converter = CurrencyConverter::new(Some("  ".to_string()));
        assert!(!converter.has_api_key());
        let err = converter
            .convert(Decimal::ONE, Currency::Usd, Currency::Eur)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_convert_success() {
        let base = start_rate_server().await;
        let converter = CurrencyConverter::with_base_url(&base, Some("key".to_string()));
        let converted = converter
            .convert(Decimal::new(10, 0), Currency::Usd, Currency::Eur)
            .await
            .unwrap();
        assert_eq!(converted, Decimal::new(5, 0));
    }

    #[tokio::test]
    async fn test_convert_api_failure() {
        let base = start_rate_server().await;
        let converter = CurrencyConverter::with_base_url(&base, Some("key".to_string()));
        let err = converter
            .convert(Decimal::new(10, 0), Currency::Usd, Currency::Jpy)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("unsupported-code"));
    }

    #[tokio::test]
    async fn test_convert_times_out() {
        let base = start_rate_server().await;
        let converter = CurrencyConverter::with_base_url(&base, Some("key".to_string()))
            .with_timeout(Duration::from_millis(200));
        let err = converter
            .convert(Decimal::new(10, 0), Currency::Usd, Currency::Chf)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
