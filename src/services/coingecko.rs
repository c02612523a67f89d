use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::{CoinGeckoConfig, DEFAULT_SOURCE};
use crate::models::observation::RawObservation;
use crate::services::market_source::{MarketSource, SourceError};

/// Maximum attempts per fetch
const MAX_RETRIES: u32 = 3;

/// Fixed delay between attempts
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    coin_ids: Vec<String>,
    source_label: String,
}

impl CoinGeckoService {
    pub fn new(config: &CoinGeckoConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            coin_ids: config.coin_ids.clone(),
            source_label: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Override the label recorded on ingestion batches.
    pub fn with_source_label(mut self, label: &str) -> Self {
        self.source_label = label.to_string();
        self
    }

    pub fn markets_url(&self) -> String {
        format!("{}/coins/markets", self.base_url)
    }

    fn markets_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", "usd".to_string()),
            ("ids", self.coin_ids.join(",")),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.coin_ids.len().max(1).to_string()),
            ("page", "1".to_string()),
        ]
    }

    /// Fetch current market data for the configured coins, retrying
    /// rate limits and transient failures.
    pub async fn fetch_coin_markets(&self) -> Result<Vec<RawObservation>, SourceError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            match self.fetch_once().await {
                Ok(records) => {
                    tracing::info!("Fetched {} market records from CoinGecko", records.len());
                    return Ok(records);
                }
                Err(SourceError::Api { status, .. }) if status == StatusCode::TOO_MANY_REQUESTS.as_u16() => {
                    tracing::warn!("CoinGecko rate limit hit (attempt {}/{})", attempt, MAX_RETRIES);
                    last_error = "rate limited".to_string();
                }
                Err(e) => {
                    tracing::warn!("CoinGecko attempt {}/{} failed: {}", attempt, MAX_RETRIES, e);
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }

        Err(SourceError::RetriesExhausted {
            attempts: MAX_RETRIES,
            last_error,
        })
    }

    async fn fetch_once(&self) -> Result<Vec<RawObservation>, SourceError> {
        let mut request = self
            .client
            .get(self.markets_url())
            .header("accept", "application/json")
            .query(&self.markets_query());

        // CoinGecko Pro authenticates with this header; the public API needs none
        if let Some(api_key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketSource for CoinGeckoService {
    fn source_label(&self) -> &str {
        &self.source_label
    }

    async fn fetch_markets(&self) -> Result<Vec<RawObservation>, SourceError> {
        self.fetch_coin_markets().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(coin_ids: &[&str]) -> CoinGeckoService {
        CoinGeckoService::new(&CoinGeckoConfig {
            api_key: None,
            base_url: "https://api.coingecko.com/api/v3/".to_string(),
            coin_ids: coin_ids.iter().map(|id| id.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_markets_url_trims_trailing_slash() {
        assert_eq!(
            service(&["bitcoin"]).markets_url(),
            "https://api.coingecko.com/api/v3/coins/markets"
        );
    }

    #[test]
    fn test_markets_query_lists_configured_ids() {
        let query = service(&["bitcoin", "ethereum", "solana"]).markets_query();
        assert!(query.contains(&("ids", "bitcoin,ethereum,solana".to_string())));
        assert!(query.contains(&("per_page", "3".to_string())));
        assert!(query.contains(&("vs_currency", "usd".to_string())));
    }

    #[test]
    fn test_source_label_defaults_to_coingecko() {
        assert_eq!(service(&["bitcoin"]).source_label(), "CoinGecko");
        assert_eq!(
            service(&["bitcoin"]).with_source_label("CoinGecko-Pro").source_label(),
            "CoinGecko-Pro"
        );
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Api { status: 429, body: "slow down".to_string() };
        assert!(err.to_string().contains("CoinGecko API error 429"));
    }
}
