use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::types::{parse_chart, FetchRequest};
use super::MarketDataSource;
use crate::errors::FetchError;
use crate::models::Candle;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart API connector.
pub struct YahooConnector {
    client: Client,
    base_url: String,
}

impl YahooConnector {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, request: &FetchRequest) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url,
            request.symbol,
            request.range_param(),
            request.interval_param()
        )
    }
}

#[async_trait]
impl MarketDataSource for YahooConnector {
    async fn fetch_candles(&self, request: &FetchRequest) -> Result<Vec<Candle>, FetchError> {
        let url = self.url(request);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        match parse_chart(&body) {
            Err(FetchError::Decode(_)) if !status.is_success() => {
                Err(FetchError::Request(format!("HTTP {status} from {url}")))
            }
            other => other,
        }
    }
}
