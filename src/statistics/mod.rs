pub mod arima;
pub mod indicators;
mod regression;
mod rolling_stats;
pub mod stationarity;

pub use arima::ArimaModel;
pub use indicators::IndicatorParams;
pub use rolling_stats::RollingStats;
pub use stationarity::adf_test;
