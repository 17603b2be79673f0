//! OrderLens: e-commerce dashboard over a merged order export
//!
//! Loads the order table, scopes it to the selected approval window, computes
//! every dashboard view and prints a summary (optionally rendering charts).

use anyhow::Result;
use clap::Parser;
use orderlens::report::{render_text, SummaryMetrics};
use orderlens::{
    generate_chart_report, load_orders, AggregationEngine, Args, Dashboard, DateRange,
    OutputFormat,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct JsonReport<'a> {
    range: DateRange,
    metrics: SummaryMetrics,
    dashboard: &'a Dashboard,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "orderlens=debug" } else { "orderlens=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let start_time = Instant::now();
    let requested = args.date_range()?;

    // Step 1: Load and normalize the order table
    let all_orders = load_orders(&args.input, args.timestamp_policy())?;

    // Step 2: Resolve the window; open ends fall back to the data's bounds
    let bounds = DateRange::bounds(&all_orders).unwrap_or_default();
    let range = requested.resolve(&all_orders);
    info!(
        available_start = ?bounds.start,
        available_end = ?bounds.end,
        start = ?range.start,
        end = ?range.end,
        "date range selected"
    );
    let scoped = range.apply(&all_orders);

    // Step 3: Aggregate
    let aggregate_start = Instant::now();
    let engine = AggregationEngine::new(&scoped);
    let dashboard = Dashboard::build(&engine)?;
    debug!(
        elapsed_ms = aggregate_start.elapsed().as_millis() as u64,
        "dashboard views computed"
    );

    // Step 4: Output
    match args.format {
        OutputFormat::Text => print!("{}", render_text(&dashboard, args.top)),
        OutputFormat::Json => {
            let report = JsonReport {
                range,
                metrics: SummaryMetrics::from_dashboard(&dashboard),
                dashboard: &dashboard,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if let Some(out_dir) = &args.output_dir {
        let charts = generate_chart_report(&dashboard, out_dir, args.top)?;
        info!(count = charts.len(), dir = %out_dir.display(), "charts written");
    }

    info!(
        elapsed_s = start_time.elapsed().as_secs_f64(),
        rows = scoped.len(),
        "done"
    );

    Ok(())
}
