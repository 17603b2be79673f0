//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::data::DateRange;
use crate::record::TimestampPolicy;

/// How the dashboard is written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// E-commerce dashboard: daily orders, spend, products, reviews, customers and RFM
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the merged order CSV
    #[arg(short, long, env = "ORDERLENS_INPUT", default_value = "all_df.csv")]
    pub input: PathBuf,

    /// First approval day to include (YYYY-MM-DD); defaults to the earliest in the data.
    /// Orders without an approval time are never in the window.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last approval day to include (YYYY-MM-DD); defaults to the latest in the data
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Number of rows shown in each top-N ranking
    #[arg(short = 'n', long, default_value = "5")]
    pub top: usize,

    /// Directory to write PNG charts into; no charts are drawn when omitted
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format for the summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Treat unparseable approval timestamps as missing instead of failing
    #[arg(long)]
    pub lenient_timestamps: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate and return the selected date window
    pub fn date_range(&self) -> crate::Result<DateRange> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                anyhow::bail!("Start date {} is after end date {}", start, end);
            }
        }
        Ok(DateRange::new(self.start, self.end))
    }

    pub fn timestamp_policy(&self) -> TimestampPolicy {
        if self.lenient_timestamps {
            TimestampPolicy::Lenient
        } else {
            TimestampPolicy::Strict
        }
    }
}
