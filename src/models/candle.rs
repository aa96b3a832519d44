use chrono::{DateTime, Utc};

/// One hourly OHLCV bar. Missing upstream quote values are stored as NaN.
#[derive(Debug, Clone)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
