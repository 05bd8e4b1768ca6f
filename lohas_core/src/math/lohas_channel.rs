use chrono::NaiveDate;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

use crate::common::lohas_error::LohasError;
use crate::series::price_series::PriceSeries;

/// 100 trading days, roughly 20 weeks
pub const DEFAULT_WINDOW: usize = 100;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelBand {
    pub lower: f64,
    pub mid: f64,
    pub upper: f64,
}

/// Sliding mean / population deviation over a fixed window.
///
/// Keeps the window's mean and sum of squared deviations, updated in O(1)
/// per price. The running state is rebuilt from the window once every
/// `period` slides, and snaps to the exact value while the window holds a
/// single repeated price.
#[derive(Debug)]
pub struct ChannelModel {
    period: usize,
    k: f64,
    prices: VecDeque<f64>,
    mean: f64,
    m2: f64,
    slides: usize,
    /// Length of the trailing run of identical prices
    run: usize,
}

impl ChannelModel {
    pub fn new(period: usize, k: f64) -> Self {
        Self {
            period,
            k,
            prices: VecDeque::with_capacity(period + 1),
            mean: 0.0,
            m2: 0.0,
            slides: 0,
            run: 0,
        }
    }

    /// Push the next close. Returns the band once the window is full.
    pub fn add(&mut self, price: f64) -> Option<ChannelBand> {
        self.run = match self.prices.back() {
            Some(&last) if last == price => self.run + 1,
            _ => 1,
        };

        if self.prices.len() < self.period {
            self.prices.push_back(price);
            let delta = price - self.mean;
            self.mean += delta / self.prices.len() as f64;
            self.m2 += delta * (price - self.mean);
        } else {
            let old = self.prices.pop_front()?;
            self.prices.push_back(price);
            let old_mean = self.mean;
            self.mean += (price - old) / self.period as f64;
            self.m2 += (price - old) * (price - self.mean + old - old_mean);
            self.slides += 1;
            if self.slides % self.period == 0 {
                self.resync();
            }
        }

        if self.prices.len() < self.period {
            return None;
        }
        if self.run >= self.period {
            self.mean = price;
            self.m2 = 0.0;
        }

        let std_dev = (self.m2.max(0.0) / self.period as f64).sqrt();
        Some(ChannelBand {
            lower: self.mean - self.k * std_dev,
            mid: self.mean,
            upper: self.mean + self.k * std_dev,
        })
    }

    /// Recompute mean and m2 from the window, centered on its oldest price
    fn resync(&mut self) {
        let Some(&base) = self.prices.front() else {
            return;
        };
        let n = self.prices.len() as f64;
        let shift = self.prices.iter().map(|&p| p - base).sum::<f64>() / n;
        self.mean = base + shift;
        self.m2 = self.prices.iter().map(|&p| (p - self.mean).powi(2)).sum();
    }
}

/// Rolling moving-average channel, one entry per input date.
///
/// Entries before the window fills are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct MovingAverageChannel {
    pub window: usize,
    pub multiplier: f64,
    pub dates: Vec<NaiveDate>,
    pub bands: Vec<Option<ChannelBand>>,
}

impl MovingAverageChannel {
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ChannelBand> {
        self.bands.get(idx).and_then(|b| b.as_ref())
    }

    /// Index of the first defined entry
    pub fn first_defined(&self) -> usize {
        self.window - 1
    }

    /// Band at the most recent date, defined whenever construction succeeded
    pub fn latest(&self) -> Option<&ChannelBand> {
        self.bands.last().and_then(|b| b.as_ref())
    }

    pub fn mid_line(&self) -> Vec<Option<f64>> {
        self.bands.iter().map(|b| b.map(|band| band.mid)).collect()
    }
}

pub fn compute_moving_average_channel(
    series: &PriceSeries,
    window: usize,
    multiplier: f64,
) -> Result<MovingAverageChannel, LohasError> {
    if window == 0 {
        return Err(LohasError::invalid_parameter("moving average window must be positive"));
    }
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(LohasError::invalid_parameter(format!(
            "band multiplier must be a non-negative number, got {}",
            multiplier
        )));
    }
    if series.len() < window {
        return Err(LohasError::insufficient_data(window, series.len()));
    }

    let mut model = ChannelModel::new(window, multiplier);
    let bands: Vec<Option<ChannelBand>> = series.iter().map(|p| model.add(p.close)).collect();

    debug!(
        "lohas channel over {} points: window={}, k={}, defined from index {}",
        series.len(),
        window,
        multiplier,
        window - 1
    );

    Ok(MovingAverageChannel {
        window,
        multiplier,
        dates: series.dates(),
        bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::utils::{mean, population_std};
    use chrono::Duration;

    fn series_of(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceSeries::from_parts(&dates, closes).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_window_of_three() {
        let channel = compute_moving_average_channel(&series_of(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3, 2.0).unwrap();
        assert!(channel.get(0).is_none());
        assert!(channel.get(1).is_none());
        assert_close(channel.get(2).unwrap().mid, 2.0);
        assert_close(channel.get(3).unwrap().mid, 3.0);
        assert_close(channel.get(4).unwrap().mid, 4.0);

        let sd = (2.0f64 / 3.0).sqrt();
        let latest = channel.latest().unwrap();
        assert_close(latest.upper, 4.0 + 2.0 * sd);
        assert_close(latest.lower, 4.0 - 2.0 * sd);
    }

    #[test]
    fn test_matches_naive_window() {
        let closes: Vec<f64> = (0..250)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.0 + i as f64 * 0.05)
            .collect();
        let channel = compute_moving_average_channel(&series_of(&closes), 20, 2.0).unwrap();
        for i in 19..closes.len() {
            let slice = &closes[i + 1 - 20..=i];
            let m = mean(slice);
            let sd = population_std(slice, m);
            let band = channel.get(i).unwrap();
            assert!((band.mid - m).abs() < 1e-8);
            assert!((band.upper - (m + 2.0 * sd)).abs() < 1e-8);
        }
    }

    #[test]
    fn test_constant_prices() {
        let channel = compute_moving_average_channel(&series_of(&[7.5; 12]), 5, 2.0).unwrap();
        let band = channel.latest().unwrap();
        assert_eq!(band.mid, 7.5);
        assert_eq!(band.upper, 7.5);
        assert_eq!(band.lower, 7.5);
    }

    #[test]
    fn test_flat_tail_after_long_volatile_run() {
        let mut closes: Vec<f64> = (0..3000)
            .map(|i| 40.0 + (i as f64 * 0.91).sin() * 9.0 + (i as f64 * 0.13).cos() * 3.0)
            .collect();
        closes.extend(std::iter::repeat(37.13).take(100));
        let channel = compute_moving_average_channel(&series_of(&closes), 100, 2.0).unwrap();
        let band = channel.latest().unwrap();
        assert_eq!(band.mid, 37.13);
        assert_eq!(band.upper, 37.13);
        assert_eq!(band.lower, 37.13);
    }

    #[test]
    fn test_resync_keeps_long_runs_accurate() {
        let closes: Vec<f64> = (0..5000)
            .map(|i| 1000.0 + (i as f64 * 0.77).sin() * 250.0)
            .collect();
        let channel = compute_moving_average_channel(&series_of(&closes), 30, 2.0).unwrap();
        let tail = &closes[closes.len() - 30..];
        let m = mean(tail);
        let band = channel.latest().unwrap();
        assert!((band.mid - m).abs() < 1e-9);
        assert!((band.upper - (m + 2.0 * population_std(tail, m))).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_and_bad_params() {
        let series = series_of(&[1.0, 2.0, 3.0, 4.0]);
        assert!(compute_moving_average_channel(&series, 5, 2.0).unwrap_err().is_insufficient_data());
        assert!(compute_moving_average_channel(&series, 4, 2.0).is_ok());
        assert!(compute_moving_average_channel(&series, 0, 2.0).unwrap_err().is_para_err());
        assert!(compute_moving_average_channel(&series, 2, -1.0).unwrap_err().is_para_err());
    }
}
