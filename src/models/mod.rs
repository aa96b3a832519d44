mod analysis;
mod asset;
mod candle;
mod series;

pub use analysis::{CriticalValues, Forecast, IndicatorSet, Stationarity, StationarityVerdict};
pub use asset::Asset;
pub use candle::Candle;
pub use series::PriceSeries;
