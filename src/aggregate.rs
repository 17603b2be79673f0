//! Aggregation engine over a date-scoped order table
//!
//! Every view is an independent single-pass reduction over the borrowed rows.
//! Grouping goes through ordered maps so that results are deterministic for a
//! given input regardless of hashing.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;
use crate::record::OrderRecord;
use crate::rfm::{self, RfmRow};

/// Orders and revenue for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    /// Distinct orders approved that day
    pub order_count: usize,
    /// Sum of payment lines approved that day
    pub revenue: f64,
}

/// Customer spend for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub total_spend: f64,
}

/// Number of order lines in a product category (`None` = uncategorised)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub count: usize,
}

/// Number of order lines placed from a city or state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCount {
    pub place: String,
    pub customer_count: usize,
}

/// Which customer location column to group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoField {
    City,
    State,
}

impl GeoField {
    fn place_of(self, record: &OrderRecord) -> &str {
        match self {
            GeoField::City => &record.customer_city,
            GeoField::State => &record.customer_state,
        }
    }
}

/// Review score histogram plus its mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDistribution {
    /// Score to number of rows, only for scores that occur
    pub counts: BTreeMap<u8, usize>,
    /// Score with the highest count; the lowest score wins a tie
    pub most_common_score: u8,
}

impl ReviewDistribution {
    /// Scores ordered by count descending, then score ascending
    pub fn ranked(&self) -> Vec<(u8, usize)> {
        let mut ranked: Vec<(u8, usize)> = self.counts.iter().map(|(&s, &c)| (s, c)).collect();
        ranked.sort_by_key(|&(score, count)| (Reverse(count), score));
        ranked
    }

    /// Number of rows carrying a review score
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Read-only engine producing the dashboard views from one filtered table
#[derive(Debug, Clone, Copy)]
pub struct AggregationEngine<'a> {
    records: &'a [OrderRecord],
}

impl<'a> AggregationEngine<'a> {
    pub fn new(records: &'a [OrderRecord]) -> Self {
        debug!(rows = records.len(), "aggregation engine ready");
        Self { records }
    }

    /// Distinct orders and summed revenue per approval day, oldest first
    pub fn daily_orders(&self) -> Vec<DailyBucket> {
        let mut days: BTreeMap<NaiveDate, (HashSet<&str>, f64)> = BTreeMap::new();

        for record in self.records {
            let Some(day) = record.approved_on() else {
                continue;
            };
            let (orders, revenue) = days.entry(day).or_default();
            orders.insert(record.order_id.as_str());
            *revenue += record.payment_value;
        }

        days.into_iter()
            .map(|(date, (orders, revenue))| DailyBucket {
                date,
                order_count: orders.len(),
                revenue,
            })
            .collect()
    }

    /// Summed payments per approval day, oldest first
    pub fn daily_spend(&self) -> Vec<DailySpend> {
        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();

        for record in self.records {
            if let Some(day) = record.approved_on() {
                *days.entry(day).or_default() += record.payment_value;
            }
        }

        days.into_iter()
            .map(|(date, total_spend)| DailySpend { date, total_spend })
            .collect()
    }

    /// Order lines per product category, most popular first
    pub fn product_popularity(&self) -> Vec<CategoryCount> {
        let categories = self.records.iter().map(|r| r.product_category_name_english.as_deref());

        count_by(categories)
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.map(str::to_owned),
                count,
            })
            .collect()
    }

    /// Histogram of review scores and its mode
    pub fn review_distribution(&self) -> Result<ReviewDistribution, AnalysisError> {
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        for score in self.records.iter().filter_map(|r| r.review_score) {
            *counts.entry(score).or_default() += 1;
        }

        // max_by_key keeps the last maximum, so walk scores high to low
        let most_common_score = counts
            .iter()
            .rev()
            .max_by_key(|&(_, &count)| count)
            .map(|(&score, _)| score)
            .ok_or(AnalysisError::EmptyInput {
                what: "most common review score",
            })?;

        Ok(ReviewDistribution {
            counts,
            most_common_score,
        })
    }

    /// Order lines per customer city or state, largest first. Rows without a
    /// place name are not counted.
    pub fn geo_counts(&self, field: GeoField) -> Vec<GeoCount> {
        let places = self
            .records
            .iter()
            .map(|r| field.place_of(r))
            .filter(|place| !place.trim().is_empty());

        count_by(places)
            .into_iter()
            .map(|(place, customer_count)| GeoCount {
                place: place.to_owned(),
                customer_count,
            })
            .collect()
    }

    /// Recency, frequency and monetary value per customer
    pub fn rfm(&self) -> Result<Vec<RfmRow>, AnalysisError> {
        rfm::compute_rfm(self.records)
    }
}

/// Count occurrences per key, sorted by count descending with ties in key order
fn count_by<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Ord,
    I: IntoIterator<Item = K>,
{
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut counts: Vec<(K, usize)> = counts.into_iter().collect();
    // stable sort keeps key order among equal counts
    counts.sort_by_key(|&(_, count)| Reverse(count));
    counts
}

/// All seven views computed from one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub daily_orders: Vec<DailyBucket>,
    pub daily_spend: Vec<DailySpend>,
    pub product_popularity: Vec<CategoryCount>,
    /// `None` when no row in range carries a review score
    pub review: Option<ReviewDistribution>,
    pub customers_by_city: Vec<GeoCount>,
    pub customers_by_state: Vec<GeoCount>,
    /// `None` when no row in range has an approval time
    pub rfm: Option<Vec<RfmRow>>,
}

impl Dashboard {
    /// Compute every view. A view whose global scalar is undefined (no scored
    /// rows, no approved rows) is left as `None` so the rest still render;
    /// any other failure is returned as is.
    pub fn build(engine: &AggregationEngine<'_>) -> Result<Self, AnalysisError> {
        let review = empty_as_none(engine.review_distribution())?;
        let rfm = empty_as_none(engine.rfm())?;

        Ok(Self {
            daily_orders: engine.daily_orders(),
            daily_spend: engine.daily_spend(),
            product_popularity: engine.product_popularity(),
            review,
            customers_by_city: engine.geo_counts(GeoField::City),
            customers_by_state: engine.geo_counts(GeoField::State),
            rfm,
        })
    }
}

fn empty_as_none<T>(result: Result<T, AnalysisError>) -> Result<Option<T>, AnalysisError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AnalysisError::EmptyInput { what }) => {
            debug!(what, "view left empty");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
