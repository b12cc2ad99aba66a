//! Tolerant field parsing for raw ingested values.
//!
//! Every function here maps a raw, possibly absent text field to a typed
//! value or `None`. Nothing in this module returns an error: a field that
//! cannot be parsed becomes null in the canonical dataset and the batch
//! carries on.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// Suffix some upstream exports append to naive timestamps.
pub const UTC_SUFFIX: &str = " UTC";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trim surrounding whitespace. Empty after trimming is `None`.
pub fn text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trim and lowercase. Empty after trimming is `None`.
pub fn lowercase_text(raw: Option<&str>) -> Option<String> {
    text(raw).map(|s| s.to_lowercase())
}

/// Parse a naive timestamp, tolerating a trailing ` UTC` or `Z`.
///
/// The value is taken as written; no zone conversion happens.
pub fn timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let mut value = raw?.trim();
    if let Some(stripped) = value.strip_suffix(UTC_SUFFIX) {
        value = stripped;
    }
    if let Some(stripped) = value.strip_suffix('Z') {
        value = stripped;
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Parse a decimal amount in plain or scientific notation.
///
/// Values that need more than 28 fractional digits are `None`, never rounded.
pub fn decimal(raw: Option<&str>) -> Option<Decimal> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    Decimal::from_str_exact(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

/// Parse a whole number. Fractional input such as `"3.0"` is rejected.
pub fn integer(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_text_trims_and_nulls_blank() {
        assert_eq!(text(Some("  store-42 ")), Some("store-42".to_string()));
        assert_eq!(text(Some("   ")), None);
        assert_eq!(text(Some("")), None);
        assert_eq!(text(None), None);
    }

    #[test]
    fn test_lowercase_text() {
        assert_eq!(lowercase_text(Some(" Closed ")), Some("closed".to_string()));
        assert_eq!(lowercase_text(Some("\t")), None);
    }

    #[test]
    fn test_timestamp_strips_utc_suffix() {
        assert_eq!(
            timestamp(Some("2025-02-01T10:05:00 UTC")),
            Some(ts("2025-02-01 10:05:00"))
        );
        assert_eq!(
            timestamp(Some(" 2025-02-01T10:00:00 UTC")),
            Some(ts("2025-02-01 10:00:00"))
        );
    }

    #[test]
    fn test_timestamp_accepts_common_layouts() {
        assert_eq!(
            timestamp(Some("2025-02-01 10:05:00")),
            Some(ts("2025-02-01 10:05:00"))
        );
        assert_eq!(
            timestamp(Some("2025-02-01T10:05:00Z")),
            Some(ts("2025-02-01 10:05:00"))
        );
        assert_eq!(
            timestamp(Some("2025-02-01T10:05")),
            Some(ts("2025-02-01 10:05:00"))
        );
        assert_eq!(timestamp(Some("2025-02-01")), Some(ts("2025-02-01 00:00:00")));

        let fractional = timestamp(Some("2025-02-01T10:05:00.250 UTC")).unwrap();
        assert_eq!(fractional.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_timestamp_unparseable_is_none() {
        assert_eq!(timestamp(Some("yesterday")), None);
        assert_eq!(timestamp(Some("2025-13-01T00:00:00")), None);
        assert_eq!(timestamp(Some(" UTC")), None);
        assert_eq!(timestamp(Some("")), None);
        assert_eq!(timestamp(None), None);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(decimal(Some("100.00")), Some(Decimal::new(10000, 2)));
        assert_eq!(decimal(Some(" -2.5 ")), Some(Decimal::new(-25, 1)));
        assert_eq!(decimal(Some("1.5e2")), Some(Decimal::new(150, 0)));
        assert_eq!(decimal(Some("ten")), None);
        assert_eq!(decimal(Some("  ")), None);
        assert_eq!(decimal(None), None);
    }

    #[test]
    fn test_decimal_beyond_precision_is_none() {
        assert_eq!(
            decimal(Some("0.0000000000000000000000000001")),
            Some(Decimal::new(1, 28))
        );
        assert_eq!(decimal(Some("0.00000000000000000000000000000001")), None);
        assert_eq!(decimal(Some("1e-100")), None);
        assert_eq!(decimal(Some("79228162514264337593543950336")), None);
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(Some(" 3 ")), Some(3));
        assert_eq!(integer(Some("-1")), Some(-1));
        assert_eq!(integer(Some("3.0")), None);
        assert_eq!(integer(Some("99999999999999999999")), None);
        assert_eq!(integer(Some("")), None);
    }
}
