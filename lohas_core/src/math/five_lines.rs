use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::common::{
    enums::XAxis,
    lohas_error::LohasError,
    time::days_between,
    utils::{mean, population_std},
};
use crate::series::price_series::PriceSeries;

/// Normal quantile covering the central 69% of mass
pub const Z69: f64 = 1.015_222_033_217_479;
/// Normal quantile covering the central 95% of mass
pub const Z95: f64 = 1.959_963_984_540_054;

/// The five lines at one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionBands {
    pub lower2: f64,
    pub lower1: f64,
    pub trend: f64,
    pub upper1: f64,
    pub upper2: f64,
}

impl RegressionBands {
    pub fn new(trend: f64, sigma: f64, inner_width: f64, outer_width: f64) -> Self {
        Self {
            lower2: trend - outer_width * sigma,
            lower1: trend - inner_width * sigma,
            trend,
            upper1: trend + inner_width * sigma,
            upper2: trend + outer_width * sigma,
        }
    }

    /// Lines in ascending order: -2sd, -1sd, trend, +1sd, +2sd
    pub fn as_array(&self) -> [f64; 5] {
        [self.lower2, self.lower1, self.trend, self.upper1, self.upper2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveLinesConfig {
    pub x_axis: XAxis,
    /// Multiple of sigma for the +-1sd lines
    pub inner_width: f64,
    /// Multiple of sigma for the +-2sd lines
    pub outer_width: f64,
}

impl Default for FiveLinesConfig {
    fn default() -> Self {
        Self {
            x_axis: XAxis::Index,
            inner_width: 1.0,
            outer_width: 2.0,
        }
    }
}

impl FiveLinesConfig {
    /// Widths at the 69% / 95% normal quantiles over calendar days
    pub fn normal_quantile() -> Self {
        Self {
            x_axis: XAxis::ElapsedDays,
            inner_width: Z69,
            outer_width: Z95,
        }
    }

    pub fn check(&self) -> Result<(), LohasError> {
        if !self.inner_width.is_finite() || !self.outer_width.is_finite() {
            return Err(LohasError::invalid_parameter("band widths must be finite"));
        }
        if self.inner_width < 0.0 || self.outer_width < self.inner_width {
            return Err(LohasError::invalid_parameter(format!(
                "band widths must satisfy 0 <= inner <= outer, got inner={} outer={}",
                self.inner_width, self.outer_width
            )));
        }
        Ok(())
    }
}

/// Least-squares trend line over the whole history with residual bands
#[derive(Debug, Clone, Serialize)]
pub struct RegressionChannel {
    pub slope: f64,
    pub intercept: f64,
    /// Population standard deviation of the residuals
    pub sigma: f64,
    pub config: FiveLinesConfig,
    pub dates: Vec<NaiveDate>,
    pub bands: Vec<RegressionBands>,
}

impl RegressionChannel {
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&RegressionBands> {
        self.bands.get(idx)
    }

    /// Bands at the most recent date
    pub fn latest(&self) -> &RegressionBands {
        &self.bands[self.bands.len() - 1]
    }

    pub fn trend_line(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.trend).collect()
    }
}

fn x_values(series: &PriceSeries, x_axis: XAxis) -> Vec<f64> {
    match x_axis {
        XAxis::Index => (0..series.len()).map(|i| i as f64).collect(),
        XAxis::ElapsedDays => {
            let start = series.first().date;
            series.iter().map(|p| days_between(start, p.date) as f64).collect()
        }
    }
}

/// Ordinary least squares `y = slope * x + intercept`.
///
/// `x` must hold at least two distinct values. Prices are centered on
/// `y[0]` before fitting so a flat series fits with exactly zero slope and
/// an intercept equal to its price.
fn fit_ols(x: &[f64], y: &[f64]) -> (f64, f64) {
    let y0 = y[0];
    let centered: Vec<f64> = y.iter().map(|&yi| yi - y0).collect();
    let x_mean = mean(x);
    let y_mean = mean(&centered);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xi, &yi) in x.iter().zip(&centered) {
        sxy += (xi - x_mean) * (yi - y_mean);
        sxx += (xi - x_mean) * (xi - x_mean);
    }
    let slope = sxy / sxx;
    (slope, y0 + (y_mean - slope * x_mean))
}

/// Fit the 5-Lines with +-1 and +-2 sigma bands over point indices
pub fn compute_regression_channel(series: &PriceSeries) -> Result<RegressionChannel, LohasError> {
    compute_regression_channel_with(series, &FiveLinesConfig::default())
}

pub fn compute_regression_channel_with(
    series: &PriceSeries,
    config: &FiveLinesConfig,
) -> Result<RegressionChannel, LohasError> {
    config.check()?;
    if series.len() < 2 {
        return Err(LohasError::insufficient_data(2, series.len()));
    }

    let x = x_values(series, config.x_axis);
    let y = series.closes();
    let (slope, intercept) = fit_ols(&x, &y);

    let fitted: Vec<f64> = x.iter().map(|&xi| slope * xi + intercept).collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let sigma = population_std(&residuals, 0.0);

    if sigma == 0.0 {
        warn!("regression residuals are all zero, bands collapse onto the trend line");
    }
    debug!(
        "5-lines over {} points: slope={:.6}, intercept={:.4}, sigma={:.4}",
        series.len(),
        slope,
        intercept,
        sigma
    );

    let bands = fitted
        .into_iter()
        .map(|trend| RegressionBands::new(trend, sigma, config.inner_width, config.outer_width))
        .collect();

    Ok(RegressionChannel {
        slope,
        intercept,
        sigma,
        config: *config,
        dates: series.dates(),
        bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series_of(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceSeries::from_parts(&dates, closes).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_perfect_line() {
        let closes: Vec<f64> = (10..=20).map(|v| v as f64).collect();
        let channel = compute_regression_channel(&series_of(&closes)).unwrap();
        assert_close(channel.slope, 1.0);
        assert_close(channel.intercept, 10.0);
        assert_close(channel.sigma, 0.0);
        for line in channel.latest().as_array() {
            assert_close(line, 20.0);
        }
    }

    #[test]
    fn test_flat_series_is_exact() {
        for &p in &[0.1, 0.3, 19.99, 37.13, 123.456, 987.65] {
            for n in [2, 30, 101, 777] {
                let channel = compute_regression_channel(&series_of(&vec![p; n])).unwrap();
                assert_eq!(channel.slope, 0.0);
                assert_eq!(channel.sigma, 0.0, "p={} n={}", p, n);
                assert_eq!(channel.latest().as_array(), [p; 5]);
            }
        }
    }

    #[test]
    fn test_sigma_is_population() {
        let channel = compute_regression_channel(&series_of(&[3.0, 1.0, 3.0, 1.0])).unwrap();
        let x_mean = 1.5;
        let slope = channel.slope;
        let expected: f64 = [3.0, 1.0, 3.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, y)| {
                let fit = 2.0 + slope * (i as f64 - x_mean);
                (y - fit).powi(2)
            })
            .sum::<f64>()
            / 4.0;
        assert_close(channel.sigma, expected.sqrt());
    }

    #[test]
    fn test_band_widths() {
        let channel = compute_regression_channel(&series_of(&[5.0, 7.0, 6.0, 9.0, 8.0])).unwrap();
        let b = channel.bands[2];
        assert_close(b.upper1 - b.trend, channel.sigma);
        assert_close(b.upper2 - b.trend, 2.0 * channel.sigma);
        assert_close(b.trend - b.lower2, 2.0 * channel.sigma);
    }

    #[test]
    fn test_elapsed_days_axis() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        // +10 per calendar day, weekend gap between the 5th and the 8th
        let series = PriceSeries::from_parts(&[d(1, 4), d(1, 5), d(1, 8)], &[10.0, 20.0, 50.0]).unwrap();
        let channel = compute_regression_channel_with(
            &series,
            &FiveLinesConfig {
                x_axis: XAxis::ElapsedDays,
                ..FiveLinesConfig::default()
            },
        )
        .unwrap();
        assert_close(channel.slope, 10.0);
        assert_close(channel.sigma, 0.0);

        let by_index = compute_regression_channel(&series).unwrap();
        assert!(by_index.sigma > 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let err = compute_regression_channel(&series_of(&[10.0])).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_invalid_widths() {
        let config = FiveLinesConfig {
            inner_width: 2.0,
            outer_width: 1.0,
            ..FiveLinesConfig::default()
        };
        assert!(config.check().is_err());
        assert!(FiveLinesConfig::normal_quantile().check().is_ok());
    }
}
