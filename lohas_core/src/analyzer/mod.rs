pub mod trend_analyzer;

// The three core operations, callable without a TrendAnalyzer
pub use crate::math::five_lines::{compute_regression_channel, compute_regression_channel_with};
pub use crate::math::lohas_channel::compute_moving_average_channel;
pub use crate::score::score_rule::{compute_score, compute_score_with};
