use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::errors::FetchError;
use crate::helpers::format_span;
use crate::models::{Asset, Candle};

/// Parameters of one history request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: String,
    pub lookback: TimeDelta,
    pub interval: TimeDelta,
}

impl FetchRequest {
    /// Trailing seven days of hourly bars.
    pub fn hourly_week(asset: Asset) -> Self {
        Self {
            symbol: asset.symbol().to_string(),
            lookback: TimeDelta::days(7),
            interval: TimeDelta::hours(1),
        }
    }

    pub fn range_param(&self) -> String {
        format_span(self.lookback)
    }

    pub fn interval_param(&self) -> String {
        format_span(self.interval)
    }

    pub fn bar_count(&self) -> usize {
        let interval = self.interval.num_seconds();
        if interval <= 0 {
            return 0;
        }
        (self.lookback.num_seconds() / interval).max(0) as usize
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<UpstreamError>,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decodes a chart payload into candles. Null quotes become NaN and rows where
/// every quote is null are dropped.
pub fn parse_chart(body: &str) -> Result<Vec<Candle>, FetchError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(FetchError::Upstream {
            code: error.code,
            description: error.description,
        });
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let value = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let candles = data
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let row = [
                value(&quote.open, i),
                value(&quote.high, i),
                value(&quote.low, i),
                value(&quote.close, i),
                value(&quote.volume, i),
            ];
            if row.iter().all(Option::is_none) {
                return None;
            }
            let [open, high, low, close, volume] = row.map(|v| v.unwrap_or(f64::NAN));
            Some(Candle {
                timestamp: DateTime::<Utc>::from_timestamp(ts, 0)?,
                open,
                high,
                low,
                close,
                volume,
            })
        })
        .collect();

    Ok(candles)
}
