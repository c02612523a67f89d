use async_trait::async_trait;
use thiserror::Error;

use crate::models::observation::RawObservation;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CoinGecko API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Anything that can hand the loader a batch of raw market observations.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Label stored on the ingestion batch, e.g. "CoinGecko"
    fn source_label(&self) -> &str;

    async fn fetch_markets(&self) -> Result<Vec<RawObservation>, SourceError>;
}
