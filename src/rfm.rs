//! RFM (Recency, Frequency, Monetary) computation
//!
//! Recency is measured against a snapshot one day after the latest approval
//! in the table, so every customer's recency is at least one day. Rows with a
//! missing approval time still count toward a customer's frequency and
//! monetary value; they are only ignored when finding the customer's last
//! purchase. A customer with no approved row at all has no recency and is
//! left out.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;
use crate::record::OrderRecord;

/// RFM metrics for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmRow {
    pub customer_id: String,
    /// Whole days between the last approved purchase and the snapshot
    pub recency: i64,
    /// Number of order lines
    pub frequency: usize,
    /// Total payment value
    pub monetary: f64,
}

#[derive(Default)]
struct CustomerTotals {
    last_seen: Option<NaiveDateTime>,
    frequency: usize,
    monetary: f64,
}

/// Reference point for recency: latest approval time plus one day
pub fn snapshot_date(records: &[OrderRecord]) -> Result<NaiveDateTime, AnalysisError> {
    records
        .iter()
        .filter_map(|r| r.order_approved_at)
        .max()
        .map(|latest| latest + Duration::days(1))
        .ok_or(AnalysisError::EmptyInput {
            what: "RFM snapshot date",
        })
}

/// Compute one RFM row per customer with at least one approved order line,
/// ordered by customer id
pub fn compute_rfm(records: &[OrderRecord]) -> Result<Vec<RfmRow>, AnalysisError> {
    let snapshot = snapshot_date(records)?;

    let mut customers: BTreeMap<&str, CustomerTotals> = BTreeMap::new();
    for record in records {
        let totals = customers.entry(record.customer_id.as_str()).or_default();
        totals.frequency += 1;
        totals.monetary += record.payment_value;
        totals.last_seen = totals.last_seen.max(record.order_approved_at);
    }

    let total_customers = customers.len();
    let rows: Vec<RfmRow> = customers
        .into_iter()
        .filter_map(|(customer_id, totals)| {
            let last_seen = totals.last_seen?;
            Some(RfmRow {
                customer_id: customer_id.to_string(),
                // snapshot is strictly after last_seen, so truncation is floor
                recency: (snapshot - last_seen).num_days(),
                frequency: totals.frequency,
                monetary: totals.monetary,
            })
        })
        .collect();

    debug!(
        %snapshot,
        customers = rows.len(),
        skipped = total_customers - rows.len(),
        "computed RFM table"
    );
    Ok(rows)
}
