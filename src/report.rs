//! Summary metrics, top-N selection and text rendering of a dashboard

use std::cmp::Ordering;
use std::fmt::{self, Write};

use crate::aggregate::{CategoryCount, Dashboard, GeoCount};
use crate::rfm::RfmRow;

/// Headline numbers shown above each chart
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryMetrics {
    pub total_orders: usize,
    pub total_revenue: f64,
    pub total_spend: f64,
    /// Mean spend per active day
    pub average_spend: Option<f64>,
    pub total_items: usize,
    /// Mean order lines per category
    pub average_items: Option<f64>,
    pub average_review_score: Option<f64>,
    pub most_common_review_score: Option<u8>,
}

impl SummaryMetrics {
    pub fn from_dashboard(dashboard: &Dashboard) -> Self {
        let total_spend: f64 = dashboard.daily_spend.iter().map(|d| d.total_spend).sum();
        let total_items: usize = dashboard.product_popularity.iter().map(|c| c.count).sum();

        let average_review_score = dashboard.review.as_ref().and_then(|review| {
            let weighted: usize = review
                .counts
                .iter()
                .map(|(&score, &count)| usize::from(score) * count)
                .sum();
            mean(weighted as f64, review.total())
        });

        Self {
            total_orders: dashboard.daily_orders.iter().map(|d| d.order_count).sum(),
            total_revenue: dashboard.daily_orders.iter().map(|d| d.revenue).sum(),
            total_spend,
            average_spend: mean(total_spend, dashboard.daily_spend.len()),
            total_items,
            average_items: mean(total_items as f64, dashboard.product_popularity.len()),
            average_review_score,
            most_common_review_score: dashboard.review.as_ref().map(|r| r.most_common_score),
        }
    }
}

fn mean(total: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| total / n as f64)
}

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56`
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

/// Categories with the most order lines
pub fn most_sold(categories: &[CategoryCount], n: usize) -> Vec<CategoryCount> {
    categories.iter().take(n).cloned().collect()
}

/// Categories with the fewest order lines, fewest first
pub fn least_sold(categories: &[CategoryCount], n: usize) -> Vec<CategoryCount> {
    let mut ascending = categories.to_vec();
    ascending.sort_by_key(|c| c.count);
    ascending.truncate(n);
    ascending
}

/// Places with the most customers
pub fn top_places(places: &[GeoCount], n: usize) -> Vec<GeoCount> {
    places.iter().take(n).cloned().collect()
}

/// Most recent customers (lowest recency first)
pub fn top_by_recency(rows: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(rows, n, |a, b| a.recency.cmp(&b.recency))
}

/// Customers with the most order lines
pub fn top_by_frequency(rows: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(rows, n, |a, b| b.frequency.cmp(&a.frequency))
}

/// Customers with the highest total payment
pub fn top_by_monetary(rows: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_by(rows, n, |a, b| b.monetary.total_cmp(&a.monetary))
}

fn top_by<F>(rows: &[RfmRow], n: usize, compare: F) -> Vec<RfmRow>
where
    F: Fn(&RfmRow, &RfmRow) -> Ordering,
{
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare(a, b));
    sorted.truncate(n);
    sorted
}

fn category_label(category: &CategoryCount) -> &str {
    category.category.as_deref().unwrap_or("(uncategorised)")
}

/// Render the dashboard as a plain-text report
pub fn render_text(dashboard: &Dashboard, top_n: usize) -> String {
    let mut out = String::new();
    // a String sink never returns fmt::Error
    let _ = write_report(&mut out, dashboard, top_n);
    out
}

fn write_report(out: &mut String, dashboard: &Dashboard, top_n: usize) -> fmt::Result {
    let metrics = SummaryMetrics::from_dashboard(dashboard);

    writeln!(out, "=== Daily Orders ===")?;
    writeln!(out, "Total orders:  {}", metrics.total_orders)?;
    writeln!(out, "Total revenue: {}", format_brl(metrics.total_revenue))?;
    writeln!(out, "Active days:   {}", dashboard.daily_orders.len())?;

    writeln!(out, "\n=== Customer Spend ===")?;
    writeln!(out, "Total spend:   {}", format_brl(metrics.total_spend))?;
    if let Some(avg) = metrics.average_spend {
        writeln!(out, "Average spend: {}", format_brl(avg))?;
    }

    writeln!(out, "\n=== Order Items ===")?;
    writeln!(out, "Total items:   {}", metrics.total_items)?;
    if let Some(avg) = metrics.average_items {
        writeln!(out, "Average items: {:.2}", avg)?;
    }
    writeln!(out, "Most sold:")?;
    for category in most_sold(&dashboard.product_popularity, top_n) {
        writeln!(out, "  {:<40} {:>8}", category_label(&category), category.count)?;
    }
    writeln!(out, "Least sold:")?;
    for category in least_sold(&dashboard.product_popularity, top_n) {
        writeln!(out, "  {:<40} {:>8}", category_label(&category), category.count)?;
    }

    writeln!(out, "\n=== Review Scores ===")?;
    match &dashboard.review {
        Some(review) => {
            if let Some(avg) = metrics.average_review_score {
                writeln!(out, "Average score:     {:.2}", avg)?;
            }
            writeln!(out, "Most common score: {}", review.most_common_score)?;
            for (score, count) in review.ranked() {
                writeln!(out, "  {score}: {count}")?;
            }
        }
        None => {
            writeln!(out, "No reviews in range")?;
        }
    }

    writeln!(out, "\n=== Customers by City (top {top_n}) ===")?;
    for place in top_places(&dashboard.customers_by_city, top_n) {
        writeln!(out, "  {:<40} {:>8}", place.place, place.customer_count)?;
    }
    writeln!(out, "\n=== Customers by State (top {top_n}) ===")?;
    for place in top_places(&dashboard.customers_by_state, top_n) {
        writeln!(out, "  {:<40} {:>8}", place.place, place.customer_count)?;
    }

    writeln!(out, "\n=== RFM (top {top_n}) ===")?;
    match &dashboard.rfm {
        Some(rows) => {
            let sections: [(&str, Vec<RfmRow>); 3] = [
                ("By recency", top_by_recency(rows, top_n)),
                ("By frequency", top_by_frequency(rows, top_n)),
                ("By monetary", top_by_monetary(rows, top_n)),
            ];
            for (title, top) in sections {
                writeln!(out, "{title}:")?;
                for row in top {
                    writeln!(
                        out,
                        "  {:<34} R={:>4} F={:>4} M={}",
                        row.customer_id,
                        row.recency,
                        row.frequency,
                        format_brl(row.monetary)
                    )?;
                }
            }
        }
        None => {
            writeln!(out, "No approved orders in range")?;
        }
    }

    Ok(())
}
