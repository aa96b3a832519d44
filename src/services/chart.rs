use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use plotters::prelude::*;

use crate::errors::ExportError;
use crate::models::{Asset, Forecast, IndicatorSet, PriceSeries};

const FORECAST_CONTEXT: usize = 100;
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PURPLE: RGBColor = RGBColor(128, 0, 128);

fn render_err<E: Display>(e: E) -> ExportError {
    ExportError::Render(e.to_string())
}

/// Draws PNG charts onto a single output file. Every render replaces the
/// previous image.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl ChartRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            width: 1200,
            height: 800,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Price panel with SMA, EMA and Bollinger Bands over an RSI panel.
    pub fn render_indicators(
        &self,
        asset: Asset,
        series: &PriceSeries,
        indicators: &IndicatorSet,
    ) -> Result<(), ExportError> {
        if series.len() < 2 || series.timestamps.len() != series.len() {
            return Err(ExportError::Render(
                "not enough price data to draw a chart".to_string(),
            ));
        }

        let ts = &series.timestamps;
        let x_range = ts[0]..ts[ts.len() - 1];
        let lines: Vec<(&str, RGBColor, Vec<(DateTime<Utc>, f64)>)> = vec![
            ("Close", BLUE, points(ts, series.closes.iter().map(|&c| Some(c)))),
            ("SMA", ORANGE, points(ts, indicators.sma.iter().copied())),
            ("EMA", GREEN, points(ts, indicators.ema.iter().copied())),
            ("Upper BB", RED, points(ts, indicators.upper_band.iter().copied())),
            ("Lower BB", RED, points(ts, indicators.lower_band.iter().copied())),
        ];
        let (y_min, y_max) =
            value_range(lines.iter().flat_map(|(_, _, pts)| pts.iter().map(|p| p.1)))
                .ok_or_else(|| ExportError::Render("no finite prices to draw".to_string()))?;

        let root = BitMapBackend::new(&self.path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let (upper, lower) = root.split_vertically(self.height as i32 * 3 / 5);

        let mut price_chart = ChartBuilder::on(&upper)
            .caption(
                format!("{} Price with SMA, EMA, Bollinger Bands", asset),
                ("sans-serif", 24).into_font(),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.clone(), y_min..y_max)
            .map_err(render_err)?;
        price_chart
            .configure_mesh()
            .y_desc("Price (USD)")
            .draw()
            .map_err(render_err)?;

        for (label, color, pts) in lines {
            price_chart
                .draw_series(LineSeries::new(pts, color.stroke_width(2)))
                .map_err(render_err)?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }
        price_chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;

        let mut rsi_chart = ChartBuilder::on(&lower)
            .caption("RSI", ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, 0.0..100.0)
            .map_err(render_err)?;
        rsi_chart.configure_mesh().draw().map_err(render_err)?;
        rsi_chart
            .draw_series(LineSeries::new(
                points(ts, indicators.rsi.iter().copied()),
                PURPLE.stroke_width(2),
            ))
            .map_err(render_err)?;
        for (level, color) in [(70.0, RED), (30.0, GREEN)] {
            rsi_chart
                .draw_series(LineSeries::new(
                    vec![(ts[0], level), (ts[ts.len() - 1], level)],
                    color.stroke_width(1),
                ))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
        info!("Chart for {} written to {}", asset, self.path.display());
        Ok(())
    }

    /// The last hundred closes followed by the forecast path.
    pub fn render_forecast(
        &self,
        asset: Asset,
        series: &PriceSeries,
        forecast: &Forecast,
    ) -> Result<(), ExportError> {
        let closes = series.forward_filled();
        let start = closes.len().saturating_sub(FORECAST_CONTEXT);
        let actual: Vec<(f64, f64)> = closes[start..]
            .iter()
            .enumerate()
            .map(|(i, &c)| ((start + i) as f64, c))
            .collect();
        let predicted: Vec<(f64, f64)> = forecast
            .steps()
            .map(|(step, v)| ((closes.len() + step - 1) as f64, v))
            .collect();

        let (y_min, y_max) = value_range(actual.iter().chain(&predicted).map(|p| p.1))
            .ok_or_else(|| ExportError::Render("no finite prices to draw".to_string()))?;
        let x_max = (closes.len() + forecast.horizon()).max(start + 1) as f64;

        let root = BitMapBackend::new(&self.path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} Forecast (Next {} Hours)", asset, forecast.horizon()),
                ("sans-serif", 24).into_font(),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(70)
            .build_cartesian_2d(start as f64..x_max, y_min..y_max)
            .map_err(render_err)?;
        chart
            .configure_mesh()
            .x_desc("Hour")
            .y_desc("Price (USD)")
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(actual, BLUE.stroke_width(2)))
            .map_err(render_err)?
            .label("Actual")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2))
            });
        chart
            .draw_series(LineSeries::new(predicted, RED.stroke_width(2)))
            .map_err(render_err)?
            .label("Forecast")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2))
            });
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!("Forecast chart for {} written to {}", asset, self.path.display());
        Ok(())
    }
}

fn points(
    timestamps: &[DateTime<Utc>],
    values: impl Iterator<Item = Option<f64>>,
) -> Vec<(DateTime<Utc>, f64)> {
    timestamps
        .iter()
        .zip(values)
        .filter_map(|(t, v)| v.filter(|v| v.is_finite()).map(|v| (*t, v)))
        .collect()
}

/// Min/max of the finite values, padded by 5% of the spread.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })?;
    let padding = (max - min).max(1e-8) * 0.05;
    Some((min - padding, max + padding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CHART_FILE;
    use crate::market_data::{FetchRequest, MarketSimulator};
    use crate::statistics::{arima, IndicatorParams};
    use approx::assert_relative_eq;
    use chrono::TimeDelta;
    use std::fs;

    #[test]
    fn test_value_range_pads_spread() {
        let (lo, hi) = value_range([10.0, f64::NAN, 20.0].into_iter()).unwrap();
        assert_relative_eq!(lo, 9.5);
        assert_relative_eq!(hi, 20.5);
        assert!(value_range([f64::NAN].into_iter()).is_none());
    }

    #[test]
    fn test_points_skip_undefined_values() {
        let start = Utc::now();
        let ts: Vec<DateTime<Utc>> = (0..4).map(|i| start + TimeDelta::hours(i)).collect();
        let pts = points(&ts, [None, Some(1.0), Some(f64::NAN), Some(3.0)].into_iter());
        assert_eq!(pts, vec![(ts[1], 1.0), (ts[3], 3.0)]);
    }

    fn simulated_week() -> PriceSeries {
        let request = FetchRequest::hourly_week(Asset::EthUsd);
        let candles = MarketSimulator::new(11).generate(&request).unwrap();
        PriceSeries::from_candles(&candles)
    }

    #[test]
    fn test_forecast_figure_replaces_indicator_figure() {
        let dir = std::env::temp_dir().join(format!("cryptocast-chart-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CHART_FILE);
        let _ = fs::remove_file(&path);
        let renderer = ChartRenderer::new(&path).with_size(640, 480);
        assert_eq!(renderer.path(), path.as_path());

        let series = simulated_week();
        let indicators = IndicatorSet::compute(&series, &IndicatorParams::default());
        renderer
            .render_indicators(Asset::EthUsd, &series, &indicators)
            .unwrap();
        let indicator_png = fs::read(&path).unwrap();
        assert!(!indicator_png.is_empty());

        let forecast = arima::forecast(&series, 24).unwrap();
        renderer
            .render_forecast(Asset::EthUsd, &series, &forecast)
            .unwrap();
        let forecast_png = fs::read(&path).unwrap();
        assert!(!forecast_png.is_empty());
        assert_ne!(indicator_png, forecast_png);
    }

    #[test]
    fn test_single_bar_is_rejected() {
        let renderer = ChartRenderer::new(std::env::temp_dir().join("cryptocast-single.png"));
        let series = PriceSeries {
            timestamps: vec![Utc::now()],
            closes: vec![1.0],
        };
        let err = renderer
            .render_indicators(Asset::EthUsd, &series, &IndicatorSet::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));
    }
}
