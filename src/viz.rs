//! Dashboard charts rendered to PNG with Plotters

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::aggregate::{CategoryCount, Dashboard, GeoCount, ReviewDistribution};
use crate::report::{
    least_sold, most_sold, top_by_frequency, top_by_monetary, top_by_recency, top_places,
};
use crate::rfm::RfmRow;

const ORDER_LINE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const SPEND_LINE: RGBColor = RGBColor(0x90, 0xCA, 0xF9);
const HIGHLIGHT: RGBColor = RGBColor(0x06, 0x8D, 0xA9);
const MUTED: RGBColor = RGBColor(0xD3, 0xD3, 0xD3);
const GEO_BAR: RGBColor = RGBColor(0x44, 0x01, 0x54);

/// Recency, frequency and monetary panel colors
const RFM_COLORS: [RGBColor; 3] = [
    RGBColor(0x72, 0xBC, 0xD4),
    RGBColor(0xFF, 0x9A, 0x9E),
    RGBColor(0x70, 0xC2, 0xA5),
];

/// One bar chart: labelled values with an optional emphasised bar
struct Bars<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: Vec<String>,
    values: Vec<f64>,
    color: RGBColor,
    highlight: Option<usize>,
}

/// Draw a line chart of one value per day
///
/// # Arguments
/// * `points` - (day label, value) pairs in date order
/// * `output_path` - Path to save the PNG plot
fn draw_daily_line(
    points: &[(String, f64)],
    title: &str,
    y_desc: &str,
    color: RGBColor,
    output_path: &Path,
) -> crate::Result<()> {
    let max_value = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let upper = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };
    let last_x = points.len().saturating_sub(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..last_x, 0f64..upper)?;

    let day_label = |x: &f64| label_at(points.iter().map(|(d, _)| d.as_str()), *x);
    chart
        .configure_mesh()
        .x_labels(points.len().min(12))
        .x_label_formatter(&day_label)
        .x_desc("Date")
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, v))| (i as f64, *v))
        .collect();
    chart.draw_series(LineSeries::new(series.iter().copied(), color.stroke_width(2)))?;
    chart.draw_series(
        series
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
    )?;

    root.present()?;
    info!(path = %output_path.display(), "{} chart saved", title);

    Ok(())
}

/// Label of the item at integer position `x`, empty between items
fn label_at<'a>(mut labels: impl Iterator<Item = &'a str>, x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels
        .nth(index as usize)
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Draw vertical bars on an existing drawing area
fn draw_bars_on(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    bars: &Bars<'_>,
) -> crate::Result<()> {
    let max_value = bars.values.iter().copied().fold(0.0_f64, f64::max);
    let upper = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };
    let n = bars.values.len().max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(bars.title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n - 0.5), 0f64..upper)?;

    let bar_label = |x: &f64| label_at(bars.labels.iter().map(String::as_str), *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.labels.len().max(1))
        .x_label_formatter(&bar_label)
        .x_desc(bars.x_desc)
        .y_desc(bars.y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, &value) in bars.values.iter().enumerate() {
        let color = match bars.highlight {
            Some(h) if h == i => &HIGHLIGHT,
            Some(_) => &MUTED,
            None => &bars.color,
        };
        let x = i as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, value)],
            color.filled(),
        )))?;
    }

    Ok(())
}

fn draw_bar_chart(bars: &Bars<'_>, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_bars_on(&root, bars)?;
    root.present()?;
    info!(path = %output_path.display(), "{} chart saved", bars.title);
    Ok(())
}

fn category_bars<'a>(title: &'a str, categories: &[CategoryCount]) -> Bars<'a> {
    Bars {
        title,
        x_desc: "Category",
        y_desc: "Items sold",
        labels: categories
            .iter()
            .map(|c| c.category.clone().unwrap_or_else(|| "(uncategorised)".to_string()))
            .collect(),
        values: categories.iter().map(|c| c.count as f64).collect(),
        color: HIGHLIGHT,
        // first bar stands out, as in the most/least sold panels
        highlight: Some(0),
    }
}

fn geo_bars<'a>(title: &'a str, x_desc: &'a str, places: &[GeoCount]) -> Bars<'a> {
    Bars {
        title,
        x_desc,
        y_desc: "Customers",
        labels: places.iter().map(|p| p.place.clone()).collect(),
        values: places.iter().map(|p| p.customer_count as f64).collect(),
        color: GEO_BAR,
        highlight: None,
    }
}

fn review_bars(review: &ReviewDistribution) -> Bars<'static> {
    let ranked = review.ranked();
    Bars {
        title: "Customer Ratings",
        x_desc: "Rating",
        y_desc: "Total customers",
        labels: ranked.iter().map(|(score, _)| score.to_string()).collect(),
        values: ranked.iter().map(|&(_, count)| count as f64).collect(),
        color: MUTED,
        highlight: ranked
            .iter()
            .position(|&(score, _)| score == review.most_common_score),
    }
}

/// Draw the three RFM top-N panels side by side
pub fn create_rfm_chart(rows: &[RfmRow], top_n: usize, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (1800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Best Customers by RFM", ("sans-serif", 30))?;
    let panels = root.split_evenly((1, 3));

    let recency = top_by_recency(rows, top_n);
    let frequency = top_by_frequency(rows, top_n);
    let monetary = top_by_monetary(rows, top_n);

    let ids = |rows: &[RfmRow]| -> Vec<String> {
        rows.iter().map(|r| short_id(&r.customer_id)).collect()
    };
    let charts = [
        Bars {
            title: "By Recency",
            x_desc: "Customer",
            y_desc: "Recency (days)",
            labels: ids(&recency),
            values: recency.iter().map(|r| r.recency as f64).collect(),
            color: RFM_COLORS[0],
            highlight: None,
        },
        Bars {
            title: "By Frequency",
            x_desc: "Customer",
            y_desc: "Frequency",
            labels: ids(&frequency),
            values: frequency.iter().map(|r| r.frequency as f64).collect(),
            color: RFM_COLORS[1],
            highlight: None,
        },
        Bars {
            title: "By Monetary",
            x_desc: "Customer",
            y_desc: "Monetary (BRL)",
            labels: ids(&monetary),
            values: monetary.iter().map(|r| r.monetary).collect(),
            color: RFM_COLORS[2],
            highlight: None,
        },
    ];

    for (panel, bars) in panels.iter().zip(charts.iter()) {
        draw_bars_on(panel, bars)?;
    }

    root.present()?;
    info!(path = %output_path.display(), "RFM chart saved");

    Ok(())
}

/// Customer ids are 32-char hashes; keep the chart axis readable
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Render every non-empty dashboard view into `out_dir`
///
/// # Returns
/// * Paths of the charts that were written
pub fn generate_chart_report(
    dashboard: &Dashboard,
    out_dir: &Path,
    top_n: usize,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    if dashboard.daily_orders.is_empty() {
        info!("no approved orders in range, skipping daily charts");
    } else {
        let orders: Vec<(String, f64)> = dashboard
            .daily_orders
            .iter()
            .map(|d| (d.date.format("%Y-%m-%d").to_string(), d.order_count as f64))
            .collect();
        let path = out_dir.join("daily_orders.png");
        draw_daily_line(&orders, "Orders per Day", "Orders", ORDER_LINE, &path)?;
        written.push(path);

        let spend: Vec<(String, f64)> = dashboard
            .daily_spend
            .iter()
            .map(|d| (d.date.format("%Y-%m-%d").to_string(), d.total_spend))
            .collect();
        let path = out_dir.join("daily_spend.png");
        draw_daily_line(&spend, "Daily Customer Spend", "Spend (BRL)", SPEND_LINE, &path)?;
        written.push(path);
    }

    if !dashboard.product_popularity.is_empty() {
        let path = out_dir.join("products_most_sold.png");
        let top = most_sold(&dashboard.product_popularity, top_n);
        draw_bar_chart(&category_bars("Best Selling Products", &top), &path)?;
        written.push(path);

        let path = out_dir.join("products_least_sold.png");
        let bottom = least_sold(&dashboard.product_popularity, top_n);
        draw_bar_chart(&category_bars("Least Selling Products", &bottom), &path)?;
        written.push(path);
    }

    if let Some(review) = &dashboard.review {
        let path = out_dir.join("review_scores.png");
        draw_bar_chart(&review_bars(review), &path)?;
        written.push(path);
    }

    let geo = [
        ("customers_by_city.png", "Customers by City", "City", &dashboard.customers_by_city),
        ("customers_by_state.png", "Customers by State", "State", &dashboard.customers_by_state),
    ];
    for (file, title, x_desc, places) in geo {
        if places.is_empty() {
            continue;
        }
        let path = out_dir.join(file);
        draw_bar_chart(&geo_bars(title, x_desc, &top_places(places, top_n)), &path)?;
        written.push(path);
    }

    match &dashboard.rfm {
        Some(rows) if !rows.is_empty() => {
            let path = out_dir.join("rfm_top_customers.png");
            create_rfm_chart(rows, top_n, &path)?;
            written.push(path);
        }
        _ => info!("no RFM rows, skipping RFM chart"),
    }

    Ok(written)
}
