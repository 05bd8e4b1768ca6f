use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::common::{
    enums::{ChannelZone, RegressionZone},
    lohas_error::{ErrCode, LohasError},
    utils::round_to,
};
use crate::config::lohas_config::LohasConfig;
use crate::math::{
    five_lines::{compute_regression_channel_with, RegressionBands, RegressionChannel},
    lohas_channel::{compute_moving_average_channel, ChannelBand, MovingAverageChannel},
};
use crate::score::score_rule::{classify_channel, classify_regression, Score};
use crate::series::price_series::PriceSeries;

/// Latest-date values of both channels, one row per stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub upper_2sd: f64,
    pub upper_1sd: f64,
    pub trend_line: f64,
    pub lower_1sd: f64,
    pub lower_2sd: f64,
    pub channel_top: f64,
    pub channel_mid: f64,
    pub channel_bottom: f64,
    pub score: Score,
}

impl LatestSnapshot {
    fn new(date: NaiveDate, close: f64, lines: &RegressionBands, band: &ChannelBand, score: Score) -> Self {
        Self {
            date,
            close,
            upper_2sd: lines.upper2,
            upper_1sd: lines.upper1,
            trend_line: lines.trend,
            lower_1sd: lines.lower1,
            lower_2sd: lines.lower2,
            channel_top: band.upper,
            channel_mid: band.mid,
            channel_bottom: band.lower,
            score,
        }
    }

    /// Copy with every price rounded to `digits` decimals
    pub fn rounded(&self, digits: i32) -> Self {
        Self {
            date: self.date,
            close: round_to(self.close, digits),
            upper_2sd: round_to(self.upper_2sd, digits),
            upper_1sd: round_to(self.upper_1sd, digits),
            trend_line: round_to(self.trend_line, digits),
            lower_1sd: round_to(self.lower_1sd, digits),
            lower_2sd: round_to(self.lower_2sd, digits),
            channel_top: round_to(self.channel_top, digits),
            channel_mid: round_to(self.channel_mid, digits),
            channel_bottom: round_to(self.channel_bottom, digits),
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub five_lines: RegressionChannel,
    pub channel: MovingAverageChannel,
    pub regression_zone: RegressionZone,
    pub channel_zone: ChannelZone,
    pub latest: LatestSnapshot,
}

impl TrendReport {
    pub fn score(&self) -> Score {
        self.latest.score
    }
}

/// Runs the 5-Lines, the Lohas Channel and the score over one series
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: LohasConfig,
}

impl TrendAnalyzer {
    pub fn new(config: LohasConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LohasConfig {
        &self.config
    }

    pub fn analyze(&self, series: &PriceSeries) -> Result<TrendReport, LohasError> {
        let needed = self.config.min_points();
        if series.len() < needed {
            return Err(LohasError::insufficient_data(needed, series.len()));
        }

        let five_lines = compute_regression_channel_with(series, &self.config.five_lines)?;
        let channel = compute_moving_average_channel(series, self.config.ma_window, self.config.ma_multiplier)?;

        let last = series.last();
        let lines = five_lines.latest();
        let band = channel.latest().ok_or_else(|| {
            LohasError::new("moving average undefined at the latest date", ErrCode::InsufficientData)
        })?;

        let regression_zone = classify_regression(last.close, lines);
        let channel_zone = classify_channel(last.close, band);
        let score = self.config.score_rule().combine(regression_zone, channel_zone);

        debug!(
            "{} close={:.2}: {} / {} channel, score {}",
            last.date, last.close, regression_zone, channel_zone, score
        );

        let latest = LatestSnapshot::new(last.date, last.close, lines, band, score);
        Ok(TrendReport {
            five_lines,
            channel,
            regression_zone,
            channel_zone,
            latest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use std::collections::HashMap;

    fn series_of(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..closes.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        PriceSeries::from_parts(&dates, closes).unwrap()
    }

    fn small_window(window: usize) -> LohasConfig {
        let conf: HashMap<String, serde_json::Value> =
            serde_json::from_value(json!({ "ma_window": window })).unwrap();
        LohasConfig::new(Some(conf)).unwrap()
    }

    #[test]
    fn test_analyze_uptrend_spike() {
        let mut closes: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        closes.push(120.0);
        let report = TrendAnalyzer::new(small_window(10)).analyze(&series_of(&closes)).unwrap();
        assert_eq!(report.regression_zone, RegressionZone::AboveUpper2);
        assert_eq!(report.channel_zone, ChannelZone::Above);
        assert_eq!(report.score(), Score::MAX);
        assert_eq!(report.five_lines.len(), closes.len());
        assert_eq!(report.channel.len(), closes.len());
        assert_eq!(report.latest.close, 120.0);
    }

    #[test]
    fn test_analyze_crash_scores_low() {
        let mut closes: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        closes.push(20.0);
        let report = TrendAnalyzer::new(small_window(10)).analyze(&series_of(&closes)).unwrap();
        assert_eq!(report.regression_zone, RegressionZone::BelowLower2);
        assert_eq!(report.channel_zone, ChannelZone::Below);
        assert_eq!(report.score(), Score::MIN);
    }

    #[test]
    fn test_default_window_needs_100_points() {
        let closes = vec![10.0; 99];
        let err = TrendAnalyzer::default().analyze(&series_of(&closes)).unwrap_err();
        assert!(err.is_insufficient_data());

        let closes = vec![10.0; 100];
        let report = TrendAnalyzer::default().analyze(&series_of(&closes)).unwrap();
        assert_eq!(report.channel.first_defined(), 99);
    }

    #[test]
    fn test_snapshot_rounding() {
        let closes: Vec<f64> = (0..12).map(|i| 10.0 + (i % 3) as f64 * 0.3333).collect();
        let report = TrendAnalyzer::new(small_window(5)).analyze(&series_of(&closes)).unwrap();
        let rounded = report.latest.rounded(2);
        assert_eq!(rounded.close, round_to(report.latest.close, 2));
        assert_eq!(rounded.score, report.latest.score);
        let json = serde_json::to_value(&rounded).unwrap();
        assert_eq!(json["date"], "2021-03-12");
        assert!(json["score"].is_u64());
    }
}
