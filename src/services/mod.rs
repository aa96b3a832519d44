pub mod chart;
pub mod export;
pub mod pipeline;

pub use chart::ChartRenderer;
pub use export::export_forecast;
pub use pipeline::{ChartReport, ForecastReport, Pipeline};
