use serde::Serialize;
use std::fmt;
use strum::IntoEnumIterator;

use crate::common::{
    enums::{ChannelZone, RegressionZone, ScoreMethod},
    lohas_error::LohasError,
};
use crate::math::{five_lines::RegressionBands, lohas_channel::ChannelBand};

/// Position score, 1 (cheap) to 6 (expensive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Score(u8);

impl Score {
    pub const MIN: Score = Score(1);
    pub const MAX: Score = Score(6);

    pub fn new(value: u8) -> Result<Self, LohasError> {
        if !(Self::MIN.0..=Self::MAX.0).contains(&value) {
            return Err(LohasError::invalid_parameter(format!(
                "score must be within [1, 6], got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Clamp any integer into [1, 6]
    pub fn saturating(value: i32) -> Self {
        Self(value.clamp(Self::MIN.0 as i32, Self::MAX.0 as i32) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Score {
    type Error = LohasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

/// Bin a price against the five regression lines. A price on a line
/// belongs to the bin above it.
pub fn classify_regression(price: f64, bands: &RegressionBands) -> RegressionZone {
    if price >= bands.upper2 {
        RegressionZone::AboveUpper2
    } else if price >= bands.upper1 {
        RegressionZone::Upper1ToUpper2
    } else if price >= bands.trend {
        RegressionZone::TrendToUpper1
    } else if price >= bands.lower1 {
        RegressionZone::Lower1ToTrend
    } else if price >= bands.lower2 {
        RegressionZone::Lower2ToLower1
    } else {
        RegressionZone::BelowLower2
    }
}

/// Bin a price against the moving-average channel. A price on the upper
/// line counts as above, on the lower line as within.
pub fn classify_channel(price: f64, band: &ChannelBand) -> ChannelZone {
    if price >= band.upper {
        ChannelZone::Above
    } else if price >= band.lower {
        ChannelZone::Within
    } else {
        ChannelZone::Below
    }
}

/// Combines the two classifications into a score.
///
/// Implementations must be non-decreasing in both arguments so the score
/// never drops as the price rises.
pub trait ScoreRule: fmt::Debug + Send + Sync {
    fn combine(&self, regression: RegressionZone, channel: ChannelZone) -> Score;

    /// Config name of this rule
    fn method(&self) -> ScoreMethod;
}

/// Regression rank shifted one step down below the channel and one step up
/// above it
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelAdjusted;

impl ScoreRule for ChannelAdjusted {
    fn combine(&self, regression: RegressionZone, channel: ChannelZone) -> Score {
        let shift = match channel {
            ChannelZone::Below => -1,
            ChannelZone::Within => 0,
            ChannelZone::Above => 1,
        };
        Score::saturating(regression.rank() as i32 + shift)
    }

    fn method(&self) -> ScoreMethod {
        ScoreMethod::ChannelAdjusted
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionOnly;

impl ScoreRule for RegressionOnly {
    fn combine(&self, regression: RegressionZone, _channel: ChannelZone) -> Score {
        Score::saturating(regression.rank() as i32)
    }

    fn method(&self) -> ScoreMethod {
        ScoreMethod::RegressionOnly
    }
}

/// Explicit 6x3 lookup, rows by regression zone, columns by channel zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreTable {
    cells: [[u8; 3]; 6],
}

impl ScoreTable {
    pub fn new(cells: [[u8; 3]; 6]) -> Result<Self, LohasError> {
        for (r, row) in cells.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                Score::new(value)?;
                if c > 0 && value < row[c - 1] {
                    return Err(LohasError::invalid_parameter(format!(
                        "score table row {} decreases at column {}",
                        r, c
                    )));
                }
                if r > 0 && value < cells[r - 1][c] {
                    return Err(LohasError::invalid_parameter(format!(
                        "score table column {} decreases at row {}",
                        c, r
                    )));
                }
            }
        }
        Ok(Self { cells })
    }

    /// Tabulate another rule
    pub fn from_rule(rule: &dyn ScoreRule) -> Self {
        let mut cells = [[0u8; 3]; 6];
        for zone in RegressionZone::iter() {
            for channel in ChannelZone::iter() {
                cells[zone as usize][channel.index()] = rule.combine(zone, channel).value();
            }
        }
        Self { cells }
    }

    pub fn cells(&self) -> &[[u8; 3]; 6] {
        &self.cells
    }
}

impl ScoreRule for ScoreTable {
    fn combine(&self, regression: RegressionZone, channel: ChannelZone) -> Score {
        Score(self.cells[regression as usize][channel.index()])
    }

    fn method(&self) -> ScoreMethod {
        ScoreMethod::Table
    }
}

/// Score with the default [`ChannelAdjusted`] rule
pub fn compute_score(latest_price: f64, regression: &RegressionBands, channel: &ChannelBand) -> Score {
    compute_score_with(&ChannelAdjusted, latest_price, regression, channel)
}

pub fn compute_score_with(
    rule: &dyn ScoreRule,
    latest_price: f64,
    regression: &RegressionBands,
    channel: &ChannelBand,
) -> Score {
    rule.combine(
        classify_regression(latest_price, regression),
        classify_channel(latest_price, channel),
    )
}
