//! Salesforge: sales outreach analysis CLI
//!
//! This is the main entrypoint that orchestrates loading, cleaning,
//! aggregation, the ARPSE metric and the printed and charted report.

use anyhow::Result;
use clap::Parser;
use salesforge::{
    clean, compute_arpse, inspect, load_sales_data, summarize_by_method, summarize_by_week, viz,
    Args,
};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        println!("Salesforge - Sales Outreach Analysis");
        println!("====================================\n");
    }

    run_pipeline(&args)
}

/// Log to stderr; `RUST_LOG` overrides the level picked from `--verbose`
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "salesforge=debug"
    } else {
        "salesforge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the full analysis pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Sales Outreach Analysis ===\n");

    let start_time = Instant::now();
    let config = args.cleaning_config()?;

    // Step 1: Load data
    if args.verbose {
        println!("Step 1: Loading data");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let mut table = load_sales_data(&args.input)?;
    tracing::info!(rows = table.len(), input = %args.input, "loaded sales data");

    println!("✓ Data loaded: {} customers", table.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Clean
    if args.verbose {
        println!("\nStep 2: Cleaning data");
        println!("  Max tenure: {} years", config.max_tenure);
    }

    let before = inspect(&table, &config)?;
    viz::print_quality_report("before cleaning", &before);

    let cleaning = clean(&mut table, &config)?;
    viz::print_cleaning_report(&cleaning);

    let after = inspect(&table, &config)?;
    viz::print_quality_report("after cleaning", &after);
    println!("\n✓ Data cleaned");

    // Step 3: Aggregate
    if args.verbose {
        println!("\nStep 3: Aggregating by method and week");
    }

    let summaries = summarize_by_method(&table)?;
    let weekly = summarize_by_week(&table)?;
    viz::print_method_summary(&summaries);
    viz::print_weekly_summary(&weekly);
    viz::print_revenue_statistics(&table)?;

    // Step 4: Metric
    let metrics = compute_arpse(&summaries)?;
    viz::print_arpse_table(&metrics);

    // Step 5: Charts
    if args.no_charts {
        tracing::info!("chart rendering skipped");
    } else {
        if args.verbose {
            println!("\nStep 5: Generating visualizations");
            println!("  Output directory: {}", args.output_dir);
        }

        let viz_start = Instant::now();
        let written = viz::generate_visualization_report(
            &table,
            &summaries,
            &weekly,
            Path::new(&args.output_dir),
        )?;

        println!("\n✓ Visualizations generated");
        for path in &written {
            println!("  {}", path.display());
        }
        if args.verbose {
            println!("  Visualization time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    println!("\n=== Analysis Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}
