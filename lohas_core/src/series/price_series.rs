use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::common::lohas_error::{ErrCode, LohasError};

/// One daily close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    fn check(&self) -> Result<(), LohasError> {
        if !self.close.is_finite() {
            return Err(LohasError::new(
                format!("{} close={} is not a finite number", self.date, self.close),
                ErrCode::PriceNotFinite,
            ));
        }
        if self.close <= 0.0 {
            return Err(LohasError::new(
                format!("{} close={} is not positive", self.date, self.close),
                ErrCode::PriceNotPositive,
            ));
        }
        Ok(())
    }
}

/// Validated closing-price history, strictly increasing by date.
///
/// There is no mutation API; a series is checked once at construction and
/// then only read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, LohasError> {
        if points.is_empty() {
            return Err(LohasError::new("price series is empty", ErrCode::EmptySeries));
        }

        for (idx, point) in points.iter().enumerate() {
            point.check()?;
            if idx == 0 {
                continue;
            }
            let prev = &points[idx - 1];
            if point.date == prev.date {
                return Err(LohasError::new(
                    format!("duplicate date {} at index {}", point.date, idx),
                    ErrCode::DuplicateDate,
                ));
            }
            if point.date < prev.date {
                return Err(LohasError::new(
                    format!("date {} at index {} is earlier than {}", point.date, idx, prev.date),
                    ErrCode::SeriesNotMonotonous,
                ));
            }
        }

        Ok(Self { points })
    }

    /// Build a series from parallel date and close slices
    pub fn from_parts(dates: &[NaiveDate], closes: &[f64]) -> Result<Self, LohasError> {
        if dates.len() != closes.len() {
            return Err(LohasError::invalid_parameter(format!(
                "dates and closes differ in length: {} vs {}",
                dates.len(),
                closes.len()
            )));
        }
        let points = dates
            .iter()
            .zip(closes)
            .map(|(&date, &close)| PricePoint::new(date, close))
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Sub-series starting at the first point on or after `start`
    pub fn since(&self, start: NaiveDate) -> Result<Self, LohasError> {
        let begin = self.points.partition_point(|p| p.date < start);
        if begin == self.points.len() {
            return Err(LohasError::new(
                format!("no data on or after {}", start),
                ErrCode::InsufficientData,
            ));
        }
        Ok(Self {
            points: self.points[begin..].to_vec(),
        })
    }
}

impl Index<usize> for PriceSeries {
    type Output = PricePoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}
