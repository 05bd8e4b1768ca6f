use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Error codes for the LOHAS analysis core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[repr(i32)]
pub enum ErrCode {
    // Data volume errors (0-99)
    #[strum(serialize = "_DATA_ERR_BEGIN")]
    DataErrBegin = 0,
    #[strum(serialize = "INSUFFICIENT_DATA")]
    InsufficientData = 1,
    #[strum(serialize = "_DATA_ERR_END")]
    DataErrEnd = 99,

    // Series integrity errors (100-199)
    #[strum(serialize = "_SERIES_ERR_BEGIN")]
    SeriesErrBegin = 100,
    #[strum(serialize = "EMPTY_SERIES")]
    EmptySeries = 101,
    #[strum(serialize = "SERIES_NOT_MONOTONOUS")]
    SeriesNotMonotonous = 102,
    #[strum(serialize = "DUPLICATE_DATE")]
    DuplicateDate = 103,
    #[strum(serialize = "PRICE_NOT_POSITIVE")]
    PriceNotPositive = 104,
    #[strum(serialize = "PRICE_NOT_FINITE")]
    PriceNotFinite = 105,
    #[strum(serialize = "_SERIES_ERR_END")]
    SeriesErrEnd = 199,

    // Parameter and configuration errors (200-299)
    #[strum(serialize = "_PARA_ERR_BEGIN")]
    ParaErrBegin = 200,
    #[strum(serialize = "INVALID_PARAMETER")]
    InvalidParameter = 201,
    #[strum(serialize = "CONFIG_ERROR")]
    ConfigError = 202,
    #[strum(serialize = "SRC_DATA_FORMAT_ERROR")]
    SrcDataFormatError = 203,
    #[strum(serialize = "_PARA_ERR_END")]
    ParaErrEnd = 299,
}

impl ErrCode {
    pub fn is_data_err(&self) -> bool {
        let code = *self as i32;
        code > Self::DataErrBegin as i32 && code < Self::DataErrEnd as i32
    }

    pub fn is_series_err(&self) -> bool {
        let code = *self as i32;
        code > Self::SeriesErrBegin as i32 && code < Self::SeriesErrEnd as i32
    }

    pub fn is_para_err(&self) -> bool {
        let code = *self as i32;
        code > Self::ParaErrBegin as i32 && code < Self::ParaErrEnd as i32
    }
}

#[derive(Debug, Clone, Error)]
#[error("{errcode}: {msg}")]
pub struct LohasError {
    pub errcode: ErrCode,
    pub msg: String,
}

impl LohasError {
    pub fn new(message: impl Into<String>, code: ErrCode) -> Self {
        Self {
            errcode: code,
            msg: message.into(),
        }
    }

    /// Series too short for the requested computation. Recoverable by
    /// fetching a longer history.
    pub fn insufficient_data(needed: usize, got: usize) -> Self {
        Self::new(
            format!("need at least {} points, got {}", needed, got),
            ErrCode::InsufficientData,
        )
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(message, ErrCode::InvalidParameter)
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.errcode == ErrCode::InsufficientData
    }

    /// Upstream handed over a malformed series (ordering, duplicates or
    /// bad prices).
    pub fn is_series_err(&self) -> bool {
        self.errcode.is_series_err()
    }

    pub fn is_para_err(&self) -> bool {
        self.errcode.is_para_err()
    }
}
