use chrono::{DateTime, Utc};

use super::Candle;

/// Closing prices aligned 1:1 with bar timestamps. NaN marks a missing close.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub closes: Vec<f64>,
}

impl PriceSeries {
    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            timestamps: candles.iter().map(|c| c.timestamp).collect(),
            closes: candles.iter().map(|c| c.close).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Closes with missing entries removed.
    pub fn dropna(&self) -> Vec<f64> {
        self.closes.iter().copied().filter(|c| c.is_finite()).collect()
    }

    /// Closes with missing entries replaced by the last known value.
    /// Leading missing entries have nothing to carry and are dropped.
    pub fn forward_filled(&self) -> Vec<f64> {
        let mut last: Option<f64> = None;
        self.closes
            .iter()
            .filter_map(|&c| {
                if c.is_finite() {
                    last = Some(c);
                }
                last
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: Vec<f64>) -> PriceSeries {
        PriceSeries {
            timestamps: Vec::new(),
            closes,
        }
    }

    #[test]
    fn test_dropna() {
        let s = series(vec![1.0, f64::NAN, 3.0]);
        assert_eq!(s.dropna(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_forward_fill() {
        let s = series(vec![f64::NAN, 2.0, f64::NAN, f64::NAN, 5.0]);
        assert_eq!(s.forward_filled(), vec![2.0, 2.0, 2.0, 5.0]);
    }
}
