pub mod analyzer;
pub mod common;
pub mod config;
pub mod math;
pub mod score;
pub mod series;

pub use analyzer::trend_analyzer::{LatestSnapshot, TrendAnalyzer, TrendReport};
pub use analyzer::{
    compute_moving_average_channel, compute_regression_channel, compute_regression_channel_with,
    compute_score, compute_score_with,
};
pub use common::enums::{ChannelZone, RegressionZone, ScoreMethod, XAxis};
pub use common::lohas_error::{ErrCode, LohasError};
pub use config::lohas_config::LohasConfig;
pub use math::five_lines::{FiveLinesConfig, RegressionBands, RegressionChannel};
pub use math::lohas_channel::{ChannelBand, MovingAverageChannel};
pub use score::score_rule::{
    classify_channel, classify_regression, ChannelAdjusted, RegressionOnly, Score, ScoreRule, ScoreTable,
};
pub use series::price_series::{PricePoint, PriceSeries};
