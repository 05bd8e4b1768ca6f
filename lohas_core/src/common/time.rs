use chrono::{NaiveDate, NaiveDateTime};

use crate::common::lohas_error::{ErrCode, LohasError};

/// Parse a trading date.
///
/// Accepts "YYYY-MM-DD", "YYYY/MM/DD", "YYYYMMDD" and "YYYY-MM-DD HH:MM:SS"
/// (the time part is dropped).
pub fn parse_trade_date(date_str: &str) -> Result<NaiveDate, LohasError> {
    let s = date_str.trim();
    let parsed = if s.len() > 10 {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
    } else if s.contains('-') {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
    } else if s.contains('/') {
        NaiveDate::parse_from_str(s, "%Y/%m/%d")
    } else {
        NaiveDate::parse_from_str(s, "%Y%m%d")
    };

    parsed.map_err(|e| {
        LohasError::new(
            format!("invalid date '{}': {}", date_str, e),
            ErrCode::SrcDataFormatError,
        )
    })
}

/// Whole days from `start` to `date`
pub fn days_between(start: NaiveDate, date: NaiveDate) -> i64 {
    (date - start).num_days()
}
