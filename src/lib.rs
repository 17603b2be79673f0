//! OrderLens: analytics over an e-commerce order table
//!
//! This library turns a date-scoped table of order lines into dashboard views:
//! daily orders and spend, product popularity, review scores, customer
//! geography and RFM (Recency, Frequency, Monetary) metrics.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod error;
pub mod record;
pub mod report;
pub mod rfm;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{
    AggregationEngine, CategoryCount, DailyBucket, DailySpend, Dashboard, GeoCount, GeoField,
    ReviewDistribution,
};
pub use cli::{Args, OutputFormat};
pub use data::{load_orders, DateRange};
pub use error::AnalysisError;
pub use record::{OrderRecord, TimestampPolicy};
pub use rfm::{compute_rfm, snapshot_date, RfmRow};
pub use viz::generate_chart_report;

/// Common result type used by the loading, reporting and charting layers
pub type Result<T> = anyhow::Result<T>;
