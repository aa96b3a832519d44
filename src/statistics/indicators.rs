use super::RollingStats;
use crate::models::{IndicatorSet, PriceSeries};

#[derive(Debug, Clone)]
pub struct IndicatorParams {
    pub sma_window: usize,
    pub ema_span: usize,
    pub rsi_period: usize,
    pub bollinger_window: usize,
    pub bollinger_num_std: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_window: 20,
            ema_span: 20,
            rsi_period: 14,
            bollinger_window: 20,
            bollinger_num_std: 2.0,
        }
    }
}

impl IndicatorSet {
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Self {
        let closes = &series.closes;
        let (upper_band, lower_band) =
            bollinger_bands(closes, params.bollinger_window, params.bollinger_num_std);

        Self {
            sma: sma(closes, params.sma_window),
            ema: ema(closes, params.ema_span),
            rsi: rsi(closes, params.rsi_period),
            upper_band,
            lower_band,
        }
    }
}

pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    RollingStats::mean(closes, window)
}

/// Recursive EMA with `alpha = 2 / (span + 1)`, seeded by the first close.
/// A missing close repeats the previous value.
pub fn ema(closes: &[f64], span: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;

    closes
        .iter()
        .map(|&close| {
            if close.is_finite() {
                prev = Some(match prev {
                    Some(p) => alpha * close + (1.0 - alpha) * p,
                    None => close,
                });
            }
            prev
        })
        .collect()
}

/// RSI over rolling means of gains and losses.
///
/// Undefined deltas (first point, neighbours of a missing close) count as no
/// movement. When the loss mean is zero the value is pinned to 100, or to 50
/// if the window had no movement at all.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let deltas: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| {
            let d = w[1] - w[0];
            if d.is_finite() {
                d
            } else {
                0.0
            }
        }))
        .take(closes.len())
        .collect();

    let gains: Vec<f64> = deltas.iter().map(|&d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|&d| (-d).max(0.0)).collect();

    RollingStats::mean(&gains, period)
        .into_iter()
        .zip(RollingStats::mean(&losses, period))
        .map(|(gain, loss)| Some(rsi_value(gain?, loss?)))
        .collect()
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 50.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Returns `(upper, lower)` bands at `num_std` rolling sample deviations around the SMA.
pub fn bollinger_bands(
    closes: &[f64],
    window: usize,
    num_std: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mid = RollingStats::mean(closes, window);
    let std = RollingStats::std_dev(closes, window);

    mid.iter()
        .zip(std.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + num_std * s), Some(m - num_std * s)),
            _ => (None, None),
        })
        .unzip()
}
