use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use super::chart::ChartRenderer;
use super::export::export_forecast;
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::market_data::{self, MarketDataSource};
use crate::models::{Asset, Forecast, IndicatorSet, PriceSeries, StationarityVerdict};
use crate::statistics::{arima, stationarity};

#[derive(Debug, Clone)]
pub struct ChartReport {
    pub asset: Asset,
    pub bars: usize,
    pub last_close: Option<f64>,
    pub last_rsi: Option<f64>,
    pub chart_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub asset: Asset,
    pub forecast: Forecast,
    pub csv_path: PathBuf,
    pub chart_path: Option<PathBuf>,
}

/// Fetch, compute and publish for one asset at a time. A failed fetch returns
/// before any statistic is computed.
pub struct Pipeline {
    source: Arc<dyn MarketDataSource>,
    config: AnalysisConfig,
    renderer: Option<ChartRenderer>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MarketDataSource>, config: AnalysisConfig) -> Self {
        let renderer = config
            .render_charts
            .then(|| ChartRenderer::new(config.chart_path()));
        Self {
            source,
            config,
            renderer,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn load(&self, asset: Asset) -> Result<PriceSeries> {
        let candles = market_data::fetch(self.source.as_ref(), asset).await?;
        Ok(PriceSeries::from_candles(&candles))
    }

    pub async fn chart(&self, asset: Asset) -> Result<ChartReport> {
        let series = self.load(asset).await?;
        let indicators = IndicatorSet::compute(&series, &self.config.indicators);

        let chart_path = match &self.renderer {
            Some(renderer) => {
                renderer.render_indicators(asset, &series, &indicators)?;
                Some(renderer.path().to_path_buf())
            }
            None => None,
        };

        let report = ChartReport {
            asset,
            bars: series.len(),
            last_close: series.closes.last().copied().filter(|c| c.is_finite()),
            last_rsi: indicators.rsi.last().copied().flatten(),
            chart_path,
        };
        debug!("Chart report: {:?}", report);
        Ok(report)
    }

    pub async fn stationarity(&self, asset: Asset) -> Result<StationarityVerdict> {
        let series = self.load(asset).await?;
        let verdict = stationarity::test_series(&series, self.config.significance)?;
        info!("{}: {}", asset, verdict);
        Ok(verdict)
    }

    pub async fn forecast(&self, asset: Asset) -> Result<ForecastReport> {
        let series = self.load(asset).await?;
        let forecast = arima::forecast(&series, self.config.horizon)?;

        let chart_path = match &self.renderer {
            Some(renderer) => {
                renderer.render_forecast(asset, &series, &forecast)?;
                Some(renderer.path().to_path_buf())
            }
            None => None,
        };

        let csv_path = self.config.forecast_path(asset);
        export_forecast(&forecast, &csv_path)?;

        Ok(ForecastReport {
            asset,
            forecast,
            csv_path,
            chart_path,
        })
    }
}
