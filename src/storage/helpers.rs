//! Shared storage helper functions.
//!
//! Text encodings for the typed columns. Timestamps use fixed-width layouts
//! so lexical order in SQLite matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use super::{Result, StorageError};

/// Layout of ingestion timestamps (`load_ts`, `source_load_ts`).
pub const LOAD_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Layout of naive business timestamps (`created_at`).
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Encode an ingestion timestamp.
pub fn format_load_ts(ts: DateTime<Utc>) -> String {
    ts.format(LOAD_TS_FORMAT).to_string()
}

/// Decode an ingestion timestamp read from `column`.
pub fn parse_load_ts(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp {
            column,
            value: value.to_string(),
        })
}

/// Encode a naive business timestamp.
pub fn format_created_at(ts: NaiveDateTime) -> String {
    ts.format(CREATED_AT_FORMAT).to_string()
}

/// Decode an optional naive business timestamp read from `column`.
pub fn parse_created_at(column: &'static str, value: Option<String>) -> Result<Option<NaiveDateTime>> {
    value
        .map(|v| {
            NaiveDateTime::parse_from_str(&v, CREATED_AT_FORMAT)
                .map_err(|_| StorageError::InvalidTimestamp { column, value: v })
        })
        .transpose()
}

/// Decode a stored decimal read from `column`.
pub fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|_| StorageError::InvalidDecimal {
        column,
        value: value.to_string(),
    })
}

/// Decode an optional stored decimal read from `column`.
pub fn parse_optional_decimal(column: &'static str, value: Option<String>) -> Result<Option<Decimal>> {
    value.map(|v| parse_decimal(column, &v)).transpose()
}
