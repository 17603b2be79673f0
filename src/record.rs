//! Typed order rows and the one-time timestamp normalization applied at load time

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnalysisError;

/// One order-item / payment line of the merged transaction table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order identifier; repeats across the lines of a multi-item order
    pub order_id: String,
    pub customer_id: String,
    /// Approval time; `None` for orders that were never approved
    pub order_approved_at: Option<NaiveDateTime>,
    pub payment_value: f64,
    pub product_id: String,
    pub product_category_name_english: Option<String>,
    pub customer_city: String,
    pub customer_state: String,
    pub review_score: Option<u8>,
}

impl OrderRecord {
    /// Calendar day of approval, if the row was approved
    pub fn approved_on(&self) -> Option<NaiveDate> {
        self.order_approved_at.map(|ts| ts.date())
    }
}

/// What to do with a timestamp that does not parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Fail the load with `MalformedTimestamp`
    #[default]
    Strict,
    /// Treat the value as missing and keep the row
    Lenient,
}

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a raw timestamp cell.
///
/// Returns `None` when the value does not parse and `Some(None)` for an empty
/// cell. Offsets in RFC 3339 input are folded into naive UTC; a bare date
/// resolves to midnight.
pub fn parse_timestamp(raw: &str) -> Option<Option<NaiveDateTime>> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(None);
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Some(ts));
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(Some(ts.naive_utc()));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Some)
}

/// Normalize a timestamp cell of row `row` under the given policy
pub fn normalize_timestamp(
    row: usize,
    raw: Option<&str>,
    policy: TimestampPolicy,
) -> Result<Option<NaiveDateTime>, AnalysisError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match (parse_timestamp(raw), policy) {
        (Some(ts), _) => Ok(ts),
        (None, TimestampPolicy::Lenient) => {
            warn!(row, value = raw, "unparseable order_approved_at, treating as missing");
            Ok(None)
        }
        (None, TimestampPolicy::Strict) => Err(AnalysisError::MalformedTimestamp {
            row,
            value: raw.to_string(),
        }),
    }
}

/// Identifier cell that must be present; blank ids would merge unrelated rows
pub fn require_id(
    row: usize,
    column: &'static str,
    raw: Option<&str>,
) -> Result<String, AnalysisError> {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AnalysisError::MalformedValue {
            row,
            column,
            value: raw.unwrap_or_default().to_string(),
        }),
    }
}

/// Coerce a payment cell; missing payments count as zero
pub fn parse_payment(row: usize, raw: Option<&str>) -> Result<f64, AnalysisError> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(0.0);
    }

    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(AnalysisError::MalformedValue {
            row,
            column: "payment_value",
            value: value.to_string(),
        }),
    }
}

/// Coerce a review score cell. Float-typed exports (`4.0`) are accepted.
pub fn parse_review_score(row: usize, raw: Option<&str>) -> Result<Option<u8>, AnalysisError> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(None);
    }

    let malformed = || AnalysisError::MalformedValue {
        row,
        column: "review_score",
        value: value.to_string(),
    };

    if let Ok(score) = value.parse::<u8>() {
        return Ok(Some(score));
    }

    let score = value.parse::<f64>().map_err(|_| malformed())?;
    if score.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&score) {
        return Err(malformed());
    }
    Ok(Some(score as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2017-10-02 11:07:15"),
            Some(Some(ts("2017-10-02 11:07:15")))
        );
        assert_eq!(
            parse_timestamp("2017-10-02T11:07:15"),
            Some(Some(ts("2017-10-02 11:07:15")))
        );
        assert_eq!(
            parse_timestamp("2017-10-02T13:07:15+02:00"),
            Some(Some(ts("2017-10-02 11:07:15")))
        );
        assert_eq!(
            parse_timestamp("2017-10-02"),
            Some(Some(ts("2017-10-02 00:00:00")))
        );
        assert_eq!(parse_timestamp("  "), Some(None));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_normalize_timestamp_policy() {
        let strict = normalize_timestamp(7, Some("32/13/2017"), TimestampPolicy::Strict);
        assert_eq!(
            strict,
            Err(AnalysisError::MalformedTimestamp {
                row: 7,
                value: "32/13/2017".to_string()
            })
        );

        let lenient = normalize_timestamp(7, Some("32/13/2017"), TimestampPolicy::Lenient);
        assert_eq!(lenient, Ok(None));

        assert_eq!(normalize_timestamp(0, None, TimestampPolicy::Strict), Ok(None));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize_timestamp(0, Some("2018-01-05 09:30:00"), TimestampPolicy::Strict)
            .unwrap()
            .unwrap();
        let rendered = first.format("%Y-%m-%d %H:%M:%S").to_string();
        let second = normalize_timestamp(0, Some(&rendered), TimestampPolicy::Strict)
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(0, "order_id", Some(" o1 ")), Ok("o1".to_string()));
        assert_eq!(
            require_id(4, "customer_id", Some("")),
            Err(AnalysisError::MalformedValue {
                row: 4,
                column: "customer_id",
                value: String::new()
            })
        );
        assert!(require_id(4, "customer_id", None).is_err());
    }

    #[test]
    fn test_parse_payment() {
        assert_eq!(parse_payment(0, Some("72.19")), Ok(72.19));
        assert_eq!(parse_payment(0, None), Ok(0.0));
        assert!(parse_payment(0, Some("-1")).is_err());
        assert!(parse_payment(0, Some("abc")).is_err());
    }

    #[test]
    fn test_parse_review_score() {
        assert_eq!(parse_review_score(0, Some("4")), Ok(Some(4)));
        assert_eq!(parse_review_score(0, Some("5.0")), Ok(Some(5)));
        assert_eq!(parse_review_score(0, Some("")), Ok(None));
        assert!(parse_review_score(0, Some("4.5")).is_err());
    }
}
