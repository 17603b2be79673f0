//! CSV loading and date-range scoping using Polars

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::record::{
    normalize_timestamp, parse_payment, parse_review_score, require_id, OrderRecord,
    TimestampPolicy,
};

const ORDER_ID: &str = "order_id";
const CUSTOMER_ID: &str = "customer_id";
const APPROVED_AT: &str = "order_approved_at";
const PAYMENT_VALUE: &str = "payment_value";
const PRODUCT_ID: &str = "product_id";
const CATEGORY: &str = "product_category_name_english";
const CITY: &str = "customer_city";
const STATE: &str = "customer_state";
const REVIEW_SCORE: &str = "review_score";

/// Columns of the merged export that the aggregation engine reads
pub const REQUIRED_COLUMNS: [&str; 9] = [
    ORDER_ID,
    CUSTOMER_ID,
    APPROVED_AT,
    PAYMENT_VALUE,
    PRODUCT_ID,
    CATEGORY,
    CITY,
    STATE,
    REVIEW_SCORE,
];

/// Load the merged order table and normalize its approval timestamps
///
/// # Arguments
/// * `file_path` - Path to the CSV export (one row per order line)
/// * `policy` - How unparseable timestamps are handled
///
/// # Returns
/// * Typed order rows in file order
pub fn load_orders(
    file_path: impl AsRef<Path>,
    policy: TimestampPolicy,
) -> crate::Result<Vec<OrderRecord>> {
    let file_path = file_path.as_ref();
    info!(path = %file_path.display(), "loading orders");

    // Read every column as text; coercion happens per row below
    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "{} is missing required columns: {}",
            file_path.display(),
            missing.join(", ")
        );
    }

    let records = frame_to_records(&df, policy)?;
    info!(rows = records.len(), "orders loaded");
    Ok(records)
}

/// Convert a string-typed frame into order rows
fn frame_to_records(df: &DataFrame, policy: TimestampPolicy) -> crate::Result<Vec<OrderRecord>> {
    let text = |name: &str| -> crate::Result<Vec<Option<String>>> {
        Ok(df
            .column(name)?
            .str()?
            .into_iter()
            .map(|value| value.map(str::to_owned))
            .collect())
    };

    let order_ids = text(ORDER_ID)?;
    let customer_ids = text(CUSTOMER_ID)?;
    let approved = text(APPROVED_AT)?;
    let payments = text(PAYMENT_VALUE)?;
    let product_ids = text(PRODUCT_ID)?;
    let categories = text(CATEGORY)?;
    let cities = text(CITY)?;
    let states = text(STATE)?;
    let scores = text(REVIEW_SCORE)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let order_approved_at = normalize_timestamp(row, approved[row].as_deref(), policy)?;
        records.push(OrderRecord {
            order_id: require_id(row, ORDER_ID, order_ids[row].as_deref())?,
            customer_id: require_id(row, CUSTOMER_ID, customer_ids[row].as_deref())?,
            order_approved_at,
            payment_value: parse_payment(row, payments[row].as_deref())?,
            product_id: product_ids[row].clone().unwrap_or_default(),
            product_category_name_english: categories[row].clone().filter(|c| !c.is_empty()),
            customer_city: cities[row].clone().unwrap_or_default(),
            customer_state: states[row].clone().unwrap_or_default(),
            review_score: parse_review_score(row, scores[row].as_deref())?,
        });
    }

    Ok(records)
}

/// Inclusive calendar-day window chosen by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Earliest and latest approval day in the table, the default window
    pub fn bounds(records: &[OrderRecord]) -> Option<Self> {
        let mut days = records.iter().filter_map(OrderRecord::approved_on);
        let first = days.next()?;
        let (min, max) = days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self::new(Some(min), Some(max)))
    }

    /// Fill open ends from the table's approval bounds, like a date picker
    /// defaulting to the full span of the data. A table with no approved rows
    /// leaves the window as requested.
    pub fn resolve(self, records: &[OrderRecord]) -> Self {
        match Self::bounds(records) {
            Some(bounds) => Self::new(self.start.or(bounds.start), self.end.or(bounds.end)),
            None => self,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether an approval time falls in the window. Unapproved rows only
    /// pass an unbounded window.
    pub fn contains(&self, approved_at: Option<NaiveDateTime>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(day) = approved_at.map(|ts| ts.date()) else {
            return false;
        };
        self.start.map_or(true, |start| day >= start) && self.end.map_or(true, |end| day <= end)
    }

    /// Copy out the rows inside the window
    pub fn apply(&self, records: &[OrderRecord]) -> Vec<OrderRecord> {
        let scoped: Vec<OrderRecord> = records
            .iter()
            .filter(|r| self.contains(r.order_approved_at))
            .cloned()
            .collect();
        debug!(
            start = ?self.start,
            end = ?self.end,
            kept = scoped.len(),
            total = records.len(),
            "applied date range"
        );
        scoped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = concat!(
        "order_id,customer_id,order_status,order_approved_at,payment_value,",
        "product_id,product_category_name_english,customer_city,customer_state,review_score"
    );

    fn create_test_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_load_orders() {
        let file = create_test_csv(&[
            "o1,c1,delivered,2017-10-02 11:07:15,38.71,p1,housewares,sao paulo,SP,4",
            "o2,c2,canceled,,0,p2,,rio de janeiro,RJ,",
        ]);

        let records = load_orders(file.path(), TimestampPolicy::Strict).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].order_id, "o1");
        assert_eq!(records[0].payment_value, 38.71);
        assert_eq!(records[0].review_score, Some(4));
        assert_eq!(
            records[0].product_category_name_english.as_deref(),
            Some("housewares")
        );
        assert!(records[1].order_approved_at.is_none());
        assert!(records[1].product_category_name_english.is_none());
        assert!(records[1].review_score.is_none());
    }

    #[test]
    fn test_load_orders_timestamp_policy() {
        let file = create_test_csv(&["o1,c1,delivered,soon,10.0,p1,toys,natal,RN,5"]);

        assert!(load_orders(file.path(), TimestampPolicy::Strict).is_err());

        let records = load_orders(file.path(), TimestampPolicy::Lenient).unwrap();
        assert!(records[0].order_approved_at.is_none());
    }

    #[test]
    fn test_load_orders_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "order_id,customer_id").unwrap();
        writeln!(file, "o1,c1").unwrap();

        let err = load_orders(file.path(), TimestampPolicy::Strict).unwrap_err();
        assert!(err.to_string().contains("payment_value"));
    }

    #[test]
    fn test_date_range_is_inclusive_of_end_day() {
        let file = create_test_csv(&[
            "o1,c1,delivered,2018-01-01 00:00:00,1,p1,toys,natal,RN,5",
            "o2,c1,delivered,2018-01-02 23:59:59,1,p1,toys,natal,RN,5",
            "o3,c2,delivered,2018-01-03 08:00:00,1,p1,toys,natal,RN,5",
            "o4,c3,created,,1,p1,toys,natal,RN,5",
        ]);
        let records = load_orders(file.path(), TimestampPolicy::Strict).unwrap();

        let range = DateRange::new(Some(day("2018-01-01")), Some(day("2018-01-02")));
        let scoped = range.apply(&records);
        let ids: Vec<_> = scoped.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);

        assert_eq!(DateRange::default().apply(&records).len(), 4);
    }

    #[test]
    fn test_load_orders_rejects_blank_ids() {
        let file = create_test_csv(&[
            "o1,c1,delivered,2018-01-01 00:00:00,1,p1,toys,natal,RN,5",
            "o2,,delivered,2018-01-01 00:00:00,1,p1,toys,natal,RN,5",
        ]);

        let err = load_orders(file.path(), TimestampPolicy::Strict).unwrap_err();
        assert_eq!(
            err.downcast::<AnalysisError>().unwrap(),
            AnalysisError::MalformedValue {
                row: 1,
                column: "customer_id",
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_resolve_defaults_to_data_bounds() {
        let file = create_test_csv(&[
            "o1,c1,delivered,2018-01-01 10:00:00,1,p1,toys,natal,RN,5",
            "o2,c2,delivered,2018-01-05 10:00:00,1,p1,toys,natal,RN,5",
            "o3,c3,created,,1,p1,toys,natal,RN,5",
        ]);
        let records = load_orders(file.path(), TimestampPolicy::Strict).unwrap();

        let range = DateRange::default().resolve(&records);
        assert_eq!(range.start, Some(day("2018-01-01")));
        assert_eq!(range.end, Some(day("2018-01-05")));
        // unapproved rows fall outside the default window
        let ids: Vec<_> = range.apply(&records).into_iter().map(|r| r.order_id).collect();
        assert_eq!(ids, vec!["o1", "o2"]);

        let range = DateRange::new(Some(day("2018-01-03")), None).resolve(&records);
        assert_eq!(range.start, Some(day("2018-01-03")));
        assert_eq!(range.end, Some(day("2018-01-05")));

        assert!(DateRange::default().resolve(&[]).is_unbounded());
    }

    #[test]
    fn test_date_range_bounds() {
        let file = create_test_csv(&[
            "o1,c1,delivered,2018-02-10 10:00:00,1,p1,toys,natal,RN,5",
            "o2,c1,delivered,2017-12-31 10:00:00,1,p1,toys,natal,RN,5",
            "o3,c3,created,,1,p1,toys,natal,RN,5",
        ]);
        let records = load_orders(file.path(), TimestampPolicy::Strict).unwrap();

        let bounds = DateRange::bounds(&records).unwrap();
        assert_eq!(bounds.start, Some(day("2017-12-31")));
        assert_eq!(bounds.end, Some(day("2018-02-10")));

        assert!(DateRange::bounds(&[]).is_none());
    }
}
