use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use crate::errors::FetchError;
use crate::market_data::{MarketDataSource, MarketSimulator, YahooConnector, YAHOO_BASE_URL};
use crate::models::Asset;
use crate::statistics::arima::DEFAULT_HORIZON;
use crate::statistics::stationarity::DEFAULT_SIGNIFICANCE;
use crate::statistics::IndicatorParams;

pub const CHART_FILE: &str = "crypto_chart.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Yahoo,
    Simulated,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            base_url: YAHOO_BASE_URL.to_string(),
            seed: 42,
        }
    }
}

impl SourceConfig {
    pub fn build(&self) -> Result<Arc<dyn MarketDataSource>, FetchError> {
        let source: Arc<dyn MarketDataSource> = match self.kind {
            SourceKind::Yahoo => Arc::new(YahooConnector::new(&self.base_url)?),
            SourceKind::Simulated => Arc::new(MarketSimulator::new(self.seed)),
        };
        Ok(source)
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub initial_asset: Asset,
    pub indicators: IndicatorParams,
    pub significance: f64,
    pub horizon: usize,
    pub refresh_interval: Duration,
    pub output_dir: PathBuf,
    pub render_charts: bool,
    pub source: SourceConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            initial_asset: Asset::default(),
            indicators: IndicatorParams::default(),
            significance: DEFAULT_SIGNIFICANCE,
            horizon: DEFAULT_HORIZON,
            refresh_interval: Duration::from_secs(60),
            output_dir: PathBuf::from("."),
            render_charts: true,
            source: SourceConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn chart_path(&self) -> PathBuf {
        self.output_dir.join(CHART_FILE)
    }

    /// `ETH-USD` exports to `ETHUSD_forecast.csv`.
    pub fn forecast_path(&self, asset: Asset) -> PathBuf {
        self.output_dir.join(format!("{}_forecast.csv", asset.file_stem()))
    }
}
