use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use crate::common::{
    enums::{ScoreMethod, XAxis},
    lohas_error::{ErrCode, LohasError},
};
use crate::math::{
    five_lines::FiveLinesConfig,
    lohas_channel::{DEFAULT_MULTIPLIER, DEFAULT_WINDOW},
};
use crate::score::score_rule::{ChannelAdjusted, RegressionOnly, ScoreRule, ScoreTable};

/// Analysis configuration
#[derive(Debug, Clone)]
pub struct LohasConfig {
    pub five_lines: FiveLinesConfig,
    /// Moving-average lookback in trading days
    pub ma_window: usize,
    /// Channel half-width in rolling standard deviations
    pub ma_multiplier: f64,
    score_rule: Arc<dyn ScoreRule>,
}

impl Default for LohasConfig {
    fn default() -> Self {
        Self {
            five_lines: FiveLinesConfig::default(),
            ma_window: DEFAULT_WINDOW,
            ma_multiplier: DEFAULT_MULTIPLIER,
            score_rule: Arc::new(ChannelAdjusted),
        }
    }
}

impl LohasConfig {
    pub fn new(conf: Option<HashMap<String, Value>>) -> Result<Self, LohasError> {
        let mut conf = ConfigWithCheck::new(conf.unwrap_or_default());
        let default = Self::default();

        let x_axis: String = conf.get("x_axis")?.unwrap_or_else(|| default.five_lines.x_axis.to_string());
        let five_lines = FiveLinesConfig {
            x_axis: parse_enum::<XAxis>("x_axis", &x_axis)?,
            inner_width: conf.get("inner_width")?.unwrap_or(default.five_lines.inner_width),
            outer_width: conf.get("outer_width")?.unwrap_or(default.five_lines.outer_width),
        };
        five_lines.check()?;

        let ma_window: usize = conf.get("ma_window")?.unwrap_or(default.ma_window);
        let ma_multiplier: f64 = conf.get("ma_multiplier")?.unwrap_or(default.ma_multiplier);
        if ma_window == 0 {
            return Err(LohasError::new("ma_window must be positive", ErrCode::ConfigError));
        }
        if !ma_multiplier.is_finite() || ma_multiplier < 0.0 {
            return Err(LohasError::new(
                format!("ma_multiplier must be non-negative, got {}", ma_multiplier),
                ErrCode::ConfigError,
            ));
        }

        let method: String = conf.get("score_rule")?.unwrap_or_else(|| default.score_method().to_string());
        let score_method = parse_enum::<ScoreMethod>("score_rule", &method)?;
        let table: Option<[[u8; 3]; 6]> = conf.get("score_table")?;
        let score_rule: Arc<dyn ScoreRule> = match (score_method, table) {
            (ScoreMethod::Table, Some(cells)) => Arc::new(ScoreTable::new(cells)?),
            (ScoreMethod::Table, None) => {
                return Err(LohasError::new(
                    "score_rule=table requires score_table",
                    ErrCode::ConfigError,
                ))
            }
            (_, Some(_)) => {
                return Err(LohasError::new(
                    format!("score_table is only used with score_rule=table, got {}", score_method),
                    ErrCode::ConfigError,
                ))
            }
            (ScoreMethod::ChannelAdjusted, None) => Arc::new(ChannelAdjusted),
            (ScoreMethod::RegressionOnly, None) => Arc::new(RegressionOnly),
        };

        conf.check()?;

        Ok(Self {
            five_lines,
            ma_window,
            ma_multiplier,
            score_rule,
        })
    }

    /// Replace the scoring rule
    pub fn with_score_rule(mut self, rule: Arc<dyn ScoreRule>) -> Self {
        self.score_rule = rule;
        self
    }

    pub fn score_rule(&self) -> &dyn ScoreRule {
        self.score_rule.as_ref()
    }

    pub fn score_method(&self) -> ScoreMethod {
        self.score_rule.method()
    }

    /// Fewest points that give both channels a value at the latest date
    pub fn min_points(&self) -> usize {
        self.ma_window.max(2)
    }
}

fn parse_enum<T: FromStr>(key: &str, value: &str) -> Result<T, LohasError> {
    T::from_str(value).map_err(|_| {
        LohasError::new(format!("unknown {}={}", key, value), ErrCode::ConfigError)
    })
}

/// Tracks which keys were read so leftovers can be reported
struct ConfigWithCheck {
    conf: HashMap<String, Value>,
    visited: HashSet<String>,
}

impl ConfigWithCheck {
    fn new(conf: HashMap<String, Value>) -> Self {
        Self {
            conf,
            visited: HashSet::new(),
        }
    }

    fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, LohasError> {
        self.visited.insert(key.to_string());
        match self.conf.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
                LohasError::new(format!("invalid value for {}: {}", key, e), ErrCode::ConfigError)
            }),
        }
    }

    fn check(&self) -> Result<(), LohasError> {
        let mut unknown: Vec<&String> = self
            .conf
            .keys()
            .filter(|k| !self.visited.contains(*k))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort();
        Err(LohasError::new(
            format!("unknown config keys: {:?}", unknown),
            ErrCode::ConfigError,
        ))
    }
}
