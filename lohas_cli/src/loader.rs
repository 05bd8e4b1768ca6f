use csv::Reader;
use lohas_core::common::time::parse_trade_date;
use lohas_core::{ErrCode, LohasError, PricePoint, PriceSeries};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

fn format_err(path: &Path, msg: impl std::fmt::Display) -> LohasError {
    LohasError::new(format!("{}: {}", path.display(), msg), ErrCode::SrcDataFormatError)
}

/// Read a `date,close` CSV into a validated series.
///
/// Columns are matched by header name, case-insensitively; other columns are
/// ignored. Rows with a zero close are skipped, anything else malformed is
/// an error.
pub fn load_price_csv(path: &Path) -> Result<PriceSeries, LohasError> {
    let file = File::open(path).map_err(|e| format_err(path, e))?;
    let mut rdr = Reader::from_reader(file);

    let headers = rdr.headers().map_err(|e| format_err(path, e))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| format_err(path, format!("missing '{}' column", name)))
    };
    let date_idx = column("date")?;
    let close_idx = column("close")?;

    let mut points = Vec::new();
    let mut skipped = 0;
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format_err(path, e))?;
        let line = row + 2;

        let date = parse_trade_date(&record[date_idx])
            .map_err(|e| format_err(path, format!("line {}: {}", line, e.msg)))?;
        let close: f64 = record[close_idx]
            .trim()
            .parse()
            .map_err(|e| format_err(path, format!("line {}: close '{}': {}", line, &record[close_idx], e)))?;

        if close == 0.0 {
            skipped += 1;
            continue;
        }
        points.push(PricePoint::new(date, close));
    }

    if skipped > 0 {
        warn!("{}: skipped {} rows with zero close", path.display(), skipped);
    }
    debug!("{}: loaded {} rows", path.display(), points.len());

    PriceSeries::new(points)
}
