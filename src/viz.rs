//! Charts and printed tables for the sales analysis using Plotters

use crate::aggregate::{
    column_values, describe, describe_by_method, values_by_method, Describe, MethodSummary,
    WeeklySummary,
};
use crate::clean::{CleaningReport, QualityReport};
use crate::data::{SalesMethod, SalesTable, NB_SITE_VISITS, NB_SOLD, REVENUE, YEARS_AS_CUSTOMER};
use crate::error::{AnalysisError, Result};
use crate::metric::{best_method, MetricRow};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// One color per sales method, indexed by `SalesMethod::index`
const METHOD_COLORS: [RGBColor; 3] = [RED, BLUE, GREEN];

fn method_color(method: SalesMethod) -> RGBColor {
    METHOD_COLORS[method.index()]
}

/// Bar chart of customer counts per sales method
pub fn create_method_count_chart(summaries: &[MethodSummary], output_path: &Path) -> Result<()> {
    if summaries.is_empty() {
        return Err(AnalysisError::Chart("no sales methods to plot".to_string()));
    }

    let max_count = summaries.iter().map(|s| s.customers).max().unwrap_or(1).max(1) as f64;
    let n_methods = summaries.len();
    let labels: Vec<&str> = summaries.iter().map(|s| s.method.as_str()).collect();

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customers per Sales Method", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n_methods as f64 - 0.5), 0f64..(max_count * 1.1))?;

    let method_label = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).map(|l| l.to_string()).unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_methods)
        .x_label_formatter(&method_label)
        .x_desc("Sales Method")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, summary) in summaries.iter().enumerate() {
        let color = method_color(summary.method);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, summary.customers as f64)],
            color.filled(),
        )))?;
    }

    root.present()?;
    tracing::debug!(path = %output_path.display(), "wrote method count chart");

    Ok(())
}

/// Vertical box plots, one per labelled group
///
/// # Arguments
/// * `title` - Chart caption
/// * `y_desc` - Value axis description
/// * `groups` - (label, values) pairs; empty groups are skipped
/// * `output_path` - Path to save the PNG plot
pub fn create_box_plot(
    title: &str,
    y_desc: &str,
    groups: &[(String, Vec<f64>)],
    output_path: &Path,
) -> Result<()> {
    let groups: Vec<(String, Quartiles)> = groups
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| (label.clone(), Quartiles::new(values)))
        .collect();
    if groups.is_empty() {
        return Err(AnalysisError::Chart(format!("no values to plot for '{}'", title)));
    }

    let (low, high) = groups.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, q)| {
        let v = q.values();
        (lo.min(v[0]), hi.max(v[4]))
    });
    let pad = ((high - low) * 0.05).max(1.0);
    let labels: Vec<String> = groups.iter().map(|(label, _)| label.clone()).collect();

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(labels[..].into_segmented(), (low - pad)..(high + pad))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|value| segment_label(value))
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(groups.iter().enumerate().map(|(i, (label, quartiles))| {
        let color = SalesMethod::from_raw(label)
            .map(method_color)
            .unwrap_or(METHOD_COLORS[i % METHOD_COLORS.len()]);
        Boxplot::new_vertical(SegmentValue::CenterOf(label), quartiles)
            .width(40)
            .whisker_width(0.5)
            .style(color)
    }))?;

    root.present()?;
    tracing::debug!(path = %output_path.display(), "wrote box plot");

    Ok(())
}

fn segment_label<T: ToString>(value: &SegmentValue<T>) -> String {
    match value {
        SegmentValue::Exact(v) | SegmentValue::CenterOf(v) => v.to_string(),
        SegmentValue::Last => String::new(),
    }
}

/// Multi-series line chart with one line per sales method over weeks
pub fn create_weekly_trend_chart(
    title: &str,
    y_desc: &str,
    series: &[(SalesMethod, Vec<(i64, f64)>)],
    output_path: &Path,
) -> Result<()> {
    let points = series.iter().flat_map(|(_, points)| points.iter());
    let (first_week, last_week, y_max) = points.fold(
        (i64::MAX, i64::MIN, 0f64),
        |(first, last, y_max), &(week, value)| (first.min(week), last.max(week), y_max.max(value)),
    );
    if first_week > last_week {
        return Err(AnalysisError::Chart(format!("no weekly values to plot for '{}'", title)));
    }
    let last_week = last_week.max(first_week + 1);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(first_week..last_week, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels((last_week - first_week + 1) as usize)
        .x_desc("Week")
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (method, points) in series {
        let color = method_color(*method);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(method.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(
            points
                .iter()
                .map(|&point| Circle::new(point, 4, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::debug!(path = %output_path.display(), "wrote weekly trend chart");

    Ok(())
}

/// Split weekly rows into one (week, value) series per method
pub fn weekly_series<F>(weekly: &[WeeklySummary], value: F) -> Vec<(SalesMethod, Vec<(i64, f64)>)>
where
    F: Fn(&WeeklySummary) -> f64,
{
    SalesMethod::ALL
        .iter()
        .map(|&method| {
            let points: Vec<(i64, f64)> = weekly
                .iter()
                .filter(|row| row.method == method)
                .map(|row| (row.week, value(row)))
                .collect();
            (method, points)
        })
        .filter(|(_, points)| !points.is_empty())
        .collect()
}

fn labelled_groups(groups: Vec<(SalesMethod, Vec<f64>)>) -> Vec<(String, Vec<f64>)> {
    groups
        .into_iter()
        .map(|(method, values)| (method.to_string(), values))
        .collect()
}

/// Print the data-quality report to console
pub fn print_quality_report(heading: &str, report: &QualityReport) {
    println!("\n=== Data Quality: {} ===", heading);
    println!("Rows: {}", report.rows);
    println!("Duplicate customer ids: {}", report.duplicate_customers);
    println!("Missing revenue: {}", report.missing_revenue);
    println!("Tenure above cap: {}", report.tenure_above_cap);
    println!("Weeks outside observation window: {}", report.weeks_outside_window);
    println!("Distinct states: {}", report.distinct_states);
    println!("\nSales method labels:");
    for (label, count) in &report.method_labels {
        println!("  {:<14} {:>6}", format!("{:?}", label), count);
    }
}

/// Print what the cleaning pass rewrote
pub fn print_cleaning_report(report: &CleaningReport) {
    println!("\n=== Cleaning ===");
    println!("Relabeled sales methods: {}", report.relabeled);
    println!("Imputed revenue values: {}", report.imputation.imputed);
    for (method, mean) in &report.imputation.group_means {
        println!("  {:<14} mean observed revenue {:>10.2}", method.as_str(), mean);
    }
    println!("Capped tenure values: {}", report.tenure_capped);
}

/// Print the per-method summary table
pub fn print_method_summary(summaries: &[MethodSummary]) {
    let total: usize = summaries.iter().map(|s| s.customers).sum();

    println!("\n=== Sales Methods ===");
    println!("  Method       | Customers |  Share | Total Revenue | Mean Revenue | Mean Tenure | Mean Sold | Mean Visits");
    println!("  -------------|-----------|--------|---------------|--------------|-------------|-----------|------------");
    for s in summaries {
        let share = if total > 0 {
            s.customers as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "  {:<12} | {:9} | {:5.1}% | {:13.2} | {:12.2} | {:11.2} | {:9.2} | {:11.2}",
            s.method.as_str(),
            s.customers,
            share,
            s.total_revenue,
            s.mean_revenue,
            s.mean_years_as_customer,
            s.mean_nb_sold,
            s.mean_site_visits
        );
    }
}

/// Print revenue and average revenue per customer by week and method
pub fn print_weekly_summary(weekly: &[WeeklySummary]) {
    println!("\n=== Revenue by Week ===");
    println!("  Week | Method       | Customers |    Revenue | Avg / Customer");
    println!("  -----|--------------|-----------|------------|---------------");
    for row in weekly {
        println!(
            "  {:4} | {:<12} | {:9} | {:10.2} | {:14.2}",
            row.week,
            row.method.as_str(),
            row.customers,
            row.revenue,
            row.avg_revenue_per_customer
        );
    }
}

/// Print descriptive statistics of revenue, overall and per method
pub fn print_revenue_statistics(table: &SalesTable) -> Result<()> {
    let mut rows: Vec<(String, Describe)> = describe(table, REVENUE)?
        .map(|d| ("All".to_string(), d))
        .into_iter()
        .collect();
    rows.extend(
        describe_by_method(table, REVENUE)?
            .into_iter()
            .map(|(method, d)| (method.to_string(), d)),
    );

    println!("\n=== Revenue Statistics ===");
    println!("  Group        | Count |   Mean |    Std |    Min |     Q1 | Median |     Q3 |    Max");
    println!("  -------------|-------|--------|--------|--------|--------|--------|--------|-------");
    for (label, d) in &rows {
        println!(
            "  {:<12} | {:5} | {:6.2} | {:6.2} | {:6.2} | {:6.2} | {:6.2} | {:6.2} | {:6.2}",
            label, d.count, d.mean, d.std, d.min, d.q1, d.median, d.q3, d.max
        );
    }

    Ok(())
}

/// Print the ARPSE table and the winning method
pub fn print_arpse_table(rows: &[MetricRow]) {
    println!("\n=== Average Revenue per Sales Effort ===");
    println!("  Method       | Total Revenue | Customers | Effort |    ARPSE");
    println!("  -------------|---------------|-----------|--------|---------");
    for row in rows {
        println!(
            "  {:<12} | {:13.2} | {:9} | {:6.1} | {:8.2}",
            row.method.as_str(),
            row.total_revenue,
            row.customers,
            row.effort_weight,
            row.arpse
        );
    }

    if let Some(best) = best_method(rows) {
        println!(
            "\n{} earns the most revenue per unit of sales effort ({:.2}).",
            best.method, best.arpse
        );
    }
}

/// Render every chart of the analysis into `output_dir`
///
/// # Returns
/// * Paths of the written PNG files
pub fn generate_visualization_report(
    table: &SalesTable,
    summaries: &[MethodSummary],
    weekly: &[WeeklySummary],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let path = output_dir.join("method_counts.png");
    create_method_count_chart(summaries, &path)?;
    written.push(path);

    let path = output_dir.join("revenue_overall_box.png");
    create_box_plot(
        "Revenue Distribution",
        "Revenue",
        &[("All".to_string(), column_values(table, REVENUE)?)],
        &path,
    )?;
    written.push(path);

    let per_method = [
        (REVENUE, "Revenue by Sales Method", "Revenue"),
        (YEARS_AS_CUSTOMER, "Years as Customer by Sales Method", "Years as Customer"),
        (NB_SOLD, "Items Sold by Sales Method", "Items Sold"),
        (NB_SITE_VISITS, "Site Visits by Sales Method", "Site Visits"),
    ];
    for (column, title, y_desc) in per_method {
        let path = output_dir.join(format!("{}_by_method_box.png", column));
        let groups = labelled_groups(values_by_method(table, column)?);
        create_box_plot(title, y_desc, &groups, &path)?;
        written.push(path);
    }

    let path = output_dir.join("revenue_by_week.png");
    create_weekly_trend_chart(
        "Revenue over Time by Sales Method",
        "Revenue",
        &weekly_series(weekly, |row| row.revenue),
        &path,
    )?;
    written.push(path);

    let path = output_dir.join("avg_revenue_per_customer_by_week.png");
    create_weekly_trend_chart(
        "Average Revenue per Customer over Time",
        "Revenue per Customer",
        &weekly_series(weekly, |row| row.avg_revenue_per_customer),
        &path,
    )?;
    written.push(path);

    tracing::info!(charts = written.len(), dir = %output_dir.display(), "charts written");
    Ok(written)
}
