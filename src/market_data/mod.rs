pub mod connector;
pub mod simulator;
pub mod types;

use async_trait::async_trait;
use log::info;

pub use connector::{YahooConnector, YAHOO_BASE_URL};
pub use simulator::MarketSimulator;
pub use types::FetchRequest;

use crate::errors::FetchError;
use crate::models::{Asset, Candle};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_candles(&self, request: &FetchRequest) -> Result<Vec<Candle>, FetchError>;
}

/// Fetches the trailing week of hourly bars for `asset`. An empty answer is an
/// error, so callers never compute on an empty series.
pub async fn fetch(source: &dyn MarketDataSource, asset: Asset) -> Result<Vec<Candle>, FetchError> {
    let request = FetchRequest::hourly_week(asset);
    let candles = source.fetch_candles(&request).await?;
    if candles.is_empty() {
        return Err(FetchError::Empty(asset.symbol().to_string()));
    }
    info!("Fetched {} bars for {}", candles.len(), asset);
    Ok(candles)
}
