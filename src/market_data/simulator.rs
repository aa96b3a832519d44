use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::types::FetchRequest;
use super::MarketDataSource;
use crate::errors::FetchError;
use crate::models::Candle;

const VOLATILITY: f64 = 0.004;

/// Offline source generating a seeded geometric random walk of hourly bars.
#[derive(Debug, Clone)]
pub struct MarketSimulator {
    seed: u64,
    bars: Option<usize>,
}

impl MarketSimulator {
    pub fn new(seed: u64) -> Self {
        Self { seed, bars: None }
    }

    /// Overrides the number of bars per request instead of deriving it from the
    /// request window. Zero simulates a source with no data.
    pub fn with_bars(mut self, bars: usize) -> Self {
        self.bars = Some(bars);
        self
    }

    fn initial_price(symbol: &str) -> f64 {
        match symbol {
            "BTC-USD" => 60_000.0,
            "ETH-USD" => 2_500.0,
            _ => 100.0,
        }
    }

    pub fn generate(&self, request: &FetchRequest) -> Result<Vec<Candle>, FetchError> {
        let bars = self.bars.unwrap_or_else(|| request.bar_count());
        let symbol_salt = request
            .symbol
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut rng = StdRng::seed_from_u64(self.seed ^ symbol_salt);
        let shocks =
            Normal::new(0.0, VOLATILITY).map_err(|e| FetchError::Request(e.to_string()))?;

        let step = request.interval.num_seconds().max(1);
        let last = Utc::now().timestamp() / step * step;

        let mut price = Self::initial_price(&request.symbol);
        let mut candles = Vec::with_capacity(bars);
        for i in 0..bars {
            let open = price;
            let close = open * shocks.sample(&mut rng).exp();
            let wick = VOLATILITY * rng.random_range(0.0..0.5);
            let ts = last - (bars - 1 - i) as i64 * step;

            candles.push(Candle {
                timestamp: DateTime::<Utc>::from_timestamp(ts, 0)
                    .ok_or_else(|| FetchError::Decode(format!("timestamp {ts} out of range")))?,
                open,
                high: open.max(close) * (1.0 + wick),
                low: open.min(close) * (1.0 - wick),
                close,
                volume: rng.random_range(100.0..1_000.0),
            });
            price = close;
        }

        Ok(candles)
    }
}

#[async_trait]
impl MarketDataSource for MarketSimulator {
    async fn fetch_candles(&self, request: &FetchRequest) -> Result<Vec<Candle>, FetchError> {
        self.generate(request)
    }
}
