use std::fs::File;
use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::errors::ExportError;
use crate::models::Forecast;

pub const FORECAST_COLUMN: &str = "forecast_price";

pub fn forecast_frame(forecast: &Forecast) -> Result<DataFrame, ExportError> {
    df!(FORECAST_COLUMN => forecast.values.clone()).map_err(|e| ExportError::Csv(e.to_string()))
}

/// Writes one `forecast_price` column, one row per step, overwriting `path`.
pub fn export_forecast(forecast: &Forecast, path: &Path) -> Result<(), ExportError> {
    let mut df = forecast_frame(forecast)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    info!("Forecast saved to {}", path.display());
    Ok(())
}
