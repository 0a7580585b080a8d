use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::QuoteError;

/// Spot price lookup in a fixed quote currency.
///
/// Implementations hold no shared mutable state and may be called
/// concurrently for different assets.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn quote(&self, asset: &str) -> Result<f64, QuoteError>;
}

/// CoinGecko `simple/price` adapter.
///
/// The response looks like `{"bitcoin": {"usd": 50123.45}}`: keyed by the
/// provider's asset id, with the amount nested under the currency.
#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    currency: String,
    // ticker => provider id
    catalog: HashMap<String, String>,
}

impl CoinGeckoClient {
    pub fn new(
        base_url: &str,
        currency: &str,
        catalog: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, QuoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: currency.to_lowercase(),
            catalog,
        })
    }

    fn provider_id(&self, asset: &str) -> Result<&str, QuoteError> {
        self.catalog
            .get(&asset.to_uppercase())
            .map(String::as_str)
            .ok_or_else(|| QuoteError::UnsupportedAsset(asset.to_string()))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn quote(&self, asset: &str) -> Result<f64, QuoteError> {
        let id = self.provider_id(asset)?;

        let url = format!("{}/simple/price", self.base_url);
        tracing::debug!(asset, id, "requesting quote");

        let res = self
            .http
            .get(&url)
            .query(&[("ids", id), ("vs_currencies", self.currency.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = res.json().await?;
        extract_price(&body, id, &self.currency)
    }
}

/// Pulls `body[id][currency]` out of a `simple/price` payload.
pub fn extract_price(body: &Value, id: &str, currency: &str) -> Result<f64, QuoteError> {
    let price = body
        .get(id)
        .and_then(|entry| entry.get(currency))
        .and_then(Value::as_f64)
        .ok_or_else(|| QuoteError::Malformed(format!("no {currency} price for {id}")))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(QuoteError::Malformed(format!("bad price {price} for {id}")));
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> CoinGeckoClient {
        let catalog = HashMap::from([("BTC".to_string(), "bitcoin".to_string())]);
        CoinGeckoClient::new("http://localhost/api/v3/", "USD", catalog, Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn extracts_nested_amount() {
        let body = json!({ "bitcoin": { "usd": 50123.45 } });
        assert_eq!(extract_price(&body, "bitcoin", "usd").unwrap(), 50123.45);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let body = json!({ "bitcoin": { "eur": 1.0 } });
        assert!(matches!(
            extract_price(&body, "bitcoin", "usd"),
            Err(QuoteError::Malformed(_))
        ));
        assert!(matches!(
            extract_price(&json!({}), "bitcoin", "usd"),
            Err(QuoteError::Malformed(_))
        ));
    }

    #[test]
    fn zero_price_is_malformed() {
        let body = json!({ "bitcoin": { "usd": 0 } });
        assert!(extract_price(&body, "bitcoin", "usd").is_err());
    }

    #[test]
    fn catalog_lookup_is_case_insensitive() {
        let c = client();
        assert_eq!(c.provider_id("btc").unwrap(), "bitcoin");
        assert!(c.provider_id("DOGE").is_err());
        assert_eq!(c.base_url, "http://localhost/api/v3");
        assert_eq!(c.currency, "usd");
    }

    #[tokio::test]
    async fn unsupported_asset_fails_without_network() {
        let c = client();
        assert!(matches!(
            c.quote("DOGE").await,
            Err(QuoteError::UnsupportedAsset(_))
        ));
    }
}
