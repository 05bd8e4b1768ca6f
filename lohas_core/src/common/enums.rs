use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

/// How series dates are mapped to the regression x axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
pub enum XAxis {
    /// Point index 0..n-1, calendar gaps ignored
    #[default]
    #[strum(serialize = "index")]
    Index,
    /// Days elapsed since the first date of the series
    #[strum(serialize = "elapsed_days")]
    ElapsedDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
pub enum ScoreMethod {
    #[default]
    #[strum(serialize = "channel_adjusted")]
    ChannelAdjusted,
    #[strum(serialize = "regression_only")]
    RegressionOnly,
    #[strum(serialize = "table")]
    Table,
}

/// Position of a price against the five regression lines.
///
/// Variants are ordered from cheapest to most expensive. Each bin includes
/// its lower line and excludes its upper one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize)]
pub enum RegressionZone {
    #[strum(serialize = "below_-2sd")]
    BelowLower2,
    #[strum(serialize = "-2sd_to_-1sd")]
    Lower2ToLower1,
    #[strum(serialize = "-1sd_to_trend")]
    Lower1ToTrend,
    #[strum(serialize = "trend_to_+1sd")]
    TrendToUpper1,
    #[strum(serialize = "+1sd_to_+2sd")]
    Upper1ToUpper2,
    #[strum(serialize = "above_+2sd")]
    AboveUpper2,
}

impl RegressionZone {
    /// 1 for the cheapest bin, 6 for the most expensive
    pub fn rank(&self) -> u8 {
        *self as u8 + 1
    }
}

/// Position of a price against the moving-average channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize)]
pub enum ChannelZone {
    #[strum(serialize = "below")]
    Below,
    #[strum(serialize = "within")]
    Within,
    #[strum(serialize = "above")]
    Above,
}

impl ChannelZone {
    pub fn index(&self) -> usize {
        *self as usize
    }
}
