use std::fmt;

/// Indicator sequences aligned index-for-index with the price series.
/// `None` marks an undefined value.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    pub sma: Vec<Option<f64>>,
    pub ema: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub upper_band: Vec<Option<f64>>,
    pub lower_band: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stationarity {
    Stationary,
    NonStationary,
}

#[derive(Debug, Clone)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone)]
pub struct StationarityVerdict {
    pub classification: Stationarity,
    pub p_value: f64,
    pub significance: f64,
    pub statistic: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl StationarityVerdict {
    pub fn is_stationary(&self) -> bool {
        self.classification == Stationarity::Stationary
    }
}

impl fmt::Display for StationarityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classification {
            Stationarity::Stationary => write!(
                f,
                "Data is stationary (p = {:.4} < {})",
                self.p_value, self.significance
            ),
            Stationarity::NonStationary => write!(
                f,
                "Data is NOT stationary (p = {:.4} >= {})",
                self.p_value, self.significance
            ),
        }
    }
}

/// Point forecasts for steps 1..=N after the last observation.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub values: Vec<f64>,
}

impl Forecast {
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Iterates `(step, price)` with steps starting at 1.
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().enumerate().map(|(i, &v)| (i + 1, v))
    }
}
