//! Group-by summaries over the cleaned sales table

use crate::data::{
    parse_methods, SalesMethod, SalesTable, CUSTOMER_ID, NB_SITE_VISITS, NB_SOLD, REVENUE, SALES_METHOD,
    WEEK, YEARS_AS_CUSTOMER,
};
use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Per-method totals and means
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSummary {
    pub method: SalesMethod,
    pub customers: usize,
    pub total_revenue: f64,
    pub mean_revenue: f64,
    pub mean_years_as_customer: f64,
    pub mean_nb_sold: f64,
    pub mean_site_visits: f64,
}

impl MethodSummary {
    fn empty(method: SalesMethod) -> Self {
        Self {
            method,
            customers: 0,
            total_revenue: 0.0,
            mean_revenue: f64::NAN,
            mean_years_as_customer: f64::NAN,
            mean_nb_sold: f64::NAN,
            mean_site_visits: f64::NAN,
        }
    }
}

/// Revenue of one method in one week
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub week: i64,
    pub method: SalesMethod,
    pub revenue: f64,
    /// Distinct customers reached
    pub customers: usize,
    pub avg_revenue_per_customer: f64,
}

/// Descriptive statistics of a numeric sample
#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, zero for a single value
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Summary statistics of `column` over the whole table; `None` when empty
pub fn describe(table: &SalesTable, column: &str) -> Result<Option<Describe>> {
    let stats = table
        .frame()
        .clone()
        .lazy()
        .select(describe_exprs(column))
        .collect()?;

    Ok(describe_rows(&stats)?.into_iter().next().flatten())
}

/// Summary statistics of `column` per method, ordered by method
pub fn describe_by_method(
    table: &SalesTable,
    column: &str,
) -> Result<Vec<(SalesMethod, Describe)>> {
    let stats = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(SALES_METHOD)])
        .agg(describe_exprs(column))
        .collect()?;

    let methods = method_values(&stats)?;
    let mut rows: Vec<(SalesMethod, Describe)> = methods
        .into_iter()
        .zip(describe_rows(&stats)?)
        .filter_map(|(method, describe)| describe.map(|d| (method, d)))
        .collect();
    rows.sort_by_key(|(method, _)| *method);

    Ok(rows)
}

fn describe_exprs(column: &str) -> Vec<Expr> {
    let value = col(column).cast(DataType::Float64);
    vec![
        value.clone().count().alias("count"),
        value.clone().mean().alias("mean"),
        value.clone().std(1).alias("std"),
        value.clone().min().alias("min"),
        value
            .clone()
            .quantile(lit(0.25), QuantileMethod::Linear)
            .alias("q1"),
        value.clone().median().alias("median"),
        value
            .clone()
            .quantile(lit(0.75), QuantileMethod::Linear)
            .alias("q3"),
        value.max().alias("max"),
    ]
}

/// One `Describe` per row of an aggregated frame. The sample standard
/// deviation of a single value is reported as zero.
fn describe_rows(stats: &DataFrame) -> Result<Vec<Option<Describe>>> {
    let stat = |name: &str| -> Result<Vec<Option<f64>>> {
        Ok(stats
            .column(name)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect())
    };

    let count = stat("count")?;
    let mean = stat("mean")?;
    let std = stat("std")?;
    let min = stat("min")?;
    let q1 = stat("q1")?;
    let median = stat("median")?;
    let q3 = stat("q3")?;
    let max = stat("max")?;

    let rows = (0..stats.height())
        .map(|i| {
            let count = count[i].unwrap_or(0.0) as usize;
            (count > 0).then(|| Describe {
                count,
                mean: mean[i].unwrap_or(f64::NAN),
                std: std[i].filter(|s| s.is_finite()).unwrap_or(0.0),
                min: min[i].unwrap_or(f64::NAN),
                q1: q1[i].unwrap_or(f64::NAN),
                median: median[i].unwrap_or(f64::NAN),
                q3: q3[i].unwrap_or(f64::NAN),
                max: max[i].unwrap_or(f64::NAN),
            })
        })
        .collect();

    Ok(rows)
}

/// Group by `sales_method`: customer count, revenue total and column means
///
/// # Returns
/// * One `MethodSummary` per method in `SalesMethod::ALL` order. A method
///   with no rows gets zero customers, zero revenue and NaN means.
pub fn summarize_by_method(table: &SalesTable) -> Result<Vec<MethodSummary>> {
    ensure_revenue_complete(table)?;

    let grouped = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(SALES_METHOD)])
        .agg([
            len().alias("customers"),
            col(REVENUE).sum().alias("total_revenue"),
            col(REVENUE).mean().alias("mean_revenue"),
            col(YEARS_AS_CUSTOMER).mean().alias("mean_years_as_customer"),
            col(NB_SOLD).mean().alias("mean_nb_sold"),
            col(NB_SITE_VISITS).mean().alias("mean_site_visits"),
        ])
        .collect()?;

    let methods = method_values(&grouped)?;
    let customers = f64_values(&grouped, "customers")?;
    let total_revenue = f64_values(&grouped, "total_revenue")?;
    let mean_revenue = f64_values(&grouped, "mean_revenue")?;
    let mean_years = f64_values(&grouped, "mean_years_as_customer")?;
    let mean_nb_sold = f64_values(&grouped, "mean_nb_sold")?;
    let mean_visits = f64_values(&grouped, "mean_site_visits")?;

    let mut present: BTreeMap<SalesMethod, MethodSummary> = methods
        .into_iter()
        .enumerate()
        .map(|(i, method)| {
            let summary = MethodSummary {
                method,
                customers: customers[i] as usize,
                total_revenue: total_revenue[i],
                mean_revenue: mean_revenue[i],
                mean_years_as_customer: mean_years[i],
                mean_nb_sold: mean_nb_sold[i],
                mean_site_visits: mean_visits[i],
            };
            (method, summary)
        })
        .collect();

    let summaries: Vec<MethodSummary> = SalesMethod::ALL
        .iter()
        .map(|&method| {
            present.remove(&method).unwrap_or_else(|| {
                tracing::warn!(method = %method, "no customers for method");
                MethodSummary::empty(method)
            })
        })
        .collect();

    tracing::debug!(groups = summaries.len(), "summarized by method");
    Ok(summaries)
}

/// Group by (`week`, `sales_method`): revenue sum and distinct customers
///
/// # Returns
/// * Rows sorted by week ascending, then by method
pub fn summarize_by_week(table: &SalesTable) -> Result<Vec<WeeklySummary>> {
    ensure_revenue_complete(table)?;

    let grouped = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(WEEK), col(SALES_METHOD)])
        .agg([
            col(REVENUE).sum().alias("revenue"),
            col(CUSTOMER_ID).n_unique().alias("customers"),
        ])
        .collect()?;

    let weeks: Vec<i64> = grouped.column(WEEK)?.i64()?.into_no_null_iter().collect();
    let methods = method_values(&grouped)?;
    let revenue = f64_values(&grouped, "revenue")?;
    let customers = f64_values(&grouped, "customers")?;

    let mut rows: Vec<WeeklySummary> = methods
        .into_iter()
        .enumerate()
        .map(|(i, method)| WeeklySummary {
            week: weeks[i],
            method,
            revenue: revenue[i],
            customers: customers[i] as usize,
            avg_revenue_per_customer: revenue[i] / customers[i],
        })
        .collect();
    rows.sort_by_key(|row| (row.week, row.method));

    tracing::debug!(groups = rows.len(), "summarized by week and method");
    Ok(rows)
}

/// All values of a numeric column, in table order
pub fn column_values(table: &SalesTable, column: &str) -> Result<Vec<f64>> {
    f64_values(table.frame(), column)
}

/// Values of a numeric column bucketed by method, ordered by method
pub fn values_by_method(table: &SalesTable, column: &str) -> Result<Vec<(SalesMethod, Vec<f64>)>> {
    let methods = method_values(table.frame())?;
    let values = f64_values(table.frame(), column)?;

    let mut buckets: BTreeMap<SalesMethod, Vec<f64>> = BTreeMap::new();
    for (method, value) in methods.into_iter().zip(values) {
        buckets.entry(method).or_default().push(value);
    }

    Ok(buckets.into_iter().collect())
}

fn ensure_revenue_complete(table: &SalesTable) -> Result<()> {
    let missing = table.frame().column(REVENUE)?.null_count();
    if missing > 0 {
        return Err(AnalysisError::Data(format!(
            "{} rows have missing revenue; clean the table before aggregating",
            missing
        )));
    }
    Ok(())
}

/// Parse the `sales_method` column of a cleaned frame
fn method_values(df: &DataFrame) -> Result<Vec<SalesMethod>> {
    parse_methods(df)
}

/// A numeric column cast to `f64`; missing values are an error
fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    if column.null_count() > 0 {
        return Err(AnalysisError::Data(format!(
            "column '{}' contains missing values",
            name
        )));
    }
    Ok(column.f64()?.into_no_null_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{clean, CleaningConfig};
    use crate::data::STATE;

    fn create_cleaned_table() -> SalesTable {
        let df = polars::df!(
            WEEK => [1i64, 1, 2, 2, 2, 3],
            SALES_METHOD => ["Email", "Call", "Email", "email", "em + call", "Call"],
            CUSTOMER_ID => ["a", "b", "c", "d", "e", "f"],
            NB_SOLD => [8i64, 9, 10, 11, 14, 10],
            REVENUE => [Some(100.0), Some(40.0), Some(200.0), None, Some(250.0), Some(60.0)],
            YEARS_AS_CUSTOMER => [1i64, 3, 5, 7, 2, 5],
            NB_SITE_VISITS => [20i64, 22, 24, 26, 30, 28],
            STATE => ["Ohio", "Ohio", "Iowa", "Utah", "Utah", "Iowa"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();
        clean(&mut table, &CleaningConfig::default()).unwrap();
        table
    }

    #[test]
    fn test_summarize_by_method() {
        let table = create_cleaned_table();
        let summaries = summarize_by_method(&table).unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].method, SalesMethod::Email);
        assert_eq!(summaries[0].customers, 3);
        // 100 + 200 + imputed 150
        assert!((summaries[0].total_revenue - 450.0).abs() < 1e-9);
        assert!((summaries[0].mean_revenue - 150.0).abs() < 1e-9);
        assert!((summaries[0].mean_years_as_customer - 13.0 / 3.0).abs() < 1e-9);

        assert_eq!(summaries[1].method, SalesMethod::Call);
        assert!((summaries[1].total_revenue - 100.0).abs() < 1e-9);
        assert!((summaries[1].mean_site_visits - 25.0).abs() < 1e-9);

        let total: usize = summaries.iter().map(|s| s.customers).sum();
        assert_eq!(total, table.len());
    }

    #[test]
    fn test_summarize_by_week_sorted() {
        let table = create_cleaned_table();
        let rows = summarize_by_week(&table).unwrap();

        let keys: Vec<(i64, SalesMethod)> = rows.iter().map(|r| (r.week, r.method)).collect();
        assert_eq!(
            keys,
            vec![
                (1, SalesMethod::Email),
                (1, SalesMethod::Call),
                (2, SalesMethod::Email),
                (2, SalesMethod::EmailAndCall),
                (3, SalesMethod::Call),
            ]
        );

        let week2_email = &rows[2];
        assert_eq!(week2_email.customers, 2);
        assert!((week2_email.revenue - 350.0).abs() < 1e-9);
        assert!((week2_email.avg_revenue_per_customer - 175.0).abs() < 1e-9);

        let customers: usize = rows.iter().map(|r| r.customers).sum();
        assert_eq!(customers, table.len());
    }

    #[test]
    fn test_aggregation_requires_clean_revenue() {
        let df = polars::df!(
            WEEK => [1i64],
            SALES_METHOD => ["Email"],
            CUSTOMER_ID => ["a"],
            NB_SOLD => [8i64],
            REVENUE => [None::<f64>],
            YEARS_AS_CUSTOMER => [1i64],
            NB_SITE_VISITS => [20i64],
            STATE => ["Ohio"]
        )
        .unwrap();
        let table = SalesTable::from_frame(df).unwrap();

        assert!(matches!(summarize_by_method(&table), Err(AnalysisError::Data(_))));
    }

    #[test]
    fn test_values_by_method() {
        let table = create_cleaned_table();
        let groups = values_by_method(&table, NB_SOLD).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], (SalesMethod::Email, vec![8.0, 10.0, 11.0]));
        assert_eq!(groups[1], (SalesMethod::Call, vec![9.0, 10.0]));
        assert_eq!(groups[2], (SalesMethod::EmailAndCall, vec![14.0]));

        assert_eq!(column_values(&table, NB_SOLD).unwrap().len(), 6);
    }

    #[test]
    fn test_summarize_by_method_keeps_absent_methods() {
        let df = polars::df!(
            WEEK => [1i64, 2, 3],
            SALES_METHOD => ["Email", "Call", "email"],
            CUSTOMER_ID => ["a", "b", "c"],
            NB_SOLD => [8i64, 9, 10],
            REVENUE => [Some(100.0), Some(40.0), Some(120.0)],
            YEARS_AS_CUSTOMER => [1i64, 3, 5],
            NB_SITE_VISITS => [20i64, 22, 24],
            STATE => ["Ohio", "Ohio", "Iowa"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();
        clean(&mut table, &CleaningConfig::default()).unwrap();

        let summaries = summarize_by_method(&table).unwrap();
        let methods: Vec<SalesMethod> = summaries.iter().map(|s| s.method).collect();
        assert_eq!(methods, SalesMethod::ALL.to_vec());

        let combined = &summaries[2];
        assert_eq!(combined.customers, 0);
        assert_eq!(combined.total_revenue, 0.0);
        assert!(combined.mean_revenue.is_nan());

        let total: usize = summaries.iter().map(|s| s.customers).sum();
        assert_eq!(total, table.len());
    }

    #[test]
    fn test_describe() {
        let df = polars::df!(
            WEEK => [1i64, 1, 2, 2, 3],
            SALES_METHOD => ["Email", "Email", "Email", "Email", "Call"],
            CUSTOMER_ID => ["a", "b", "c", "d", "e"],
            NB_SOLD => [4i64, 1, 3, 2, 7],
            REVENUE => [Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)],
            YEARS_AS_CUSTOMER => [1i64, 3, 5, 7, 9],
            NB_SITE_VISITS => [20i64, 22, 24, 26, 28],
            STATE => ["Ohio", "Ohio", "Iowa", "Utah", "Utah"]
        )
        .unwrap();
        let table = SalesTable::from_frame(df).unwrap();

        let groups = describe_by_method(&table, NB_SOLD).unwrap();
        assert_eq!(groups.len(), 2);

        let (method, stats) = &groups[0];
        assert_eq!(*method, SalesMethod::Email);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.q1 - 1.75).abs() < 1e-12);
        assert!((stats.q3 - 3.25).abs() < 1e-12);
        assert!((stats.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);

        // A single value has no spread
        let (method, single) = &groups[1];
        assert_eq!(*method, SalesMethod::Call);
        assert_eq!(single.count, 1);
        assert_eq!(single.std, 0.0);
        assert_eq!(single.median, 7.0);

        let overall = describe(&table, REVENUE).unwrap().unwrap();
        assert_eq!(overall.count, 5);
        assert!((overall.mean - 30.0).abs() < 1e-12);
        assert!((overall.q1 - 20.0).abs() < 1e-12);
        assert!((overall.q3 - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_describe_empty_table() {
        let df = polars::df!(
            WEEK => Vec::<i64>::new(),
            SALES_METHOD => Vec::<&str>::new(),
            CUSTOMER_ID => Vec::<&str>::new(),
            NB_SOLD => Vec::<i64>::new(),
            REVENUE => Vec::<f64>::new(),
            YEARS_AS_CUSTOMER => Vec::<i64>::new(),
            NB_SITE_VISITS => Vec::<i64>::new(),
            STATE => Vec::<&str>::new()
        )
        .unwrap();
        let table = SalesTable::from_frame(df).unwrap();

        assert!(describe(&table, REVENUE).unwrap().is_none());
        assert!(describe_by_method(&table, REVENUE).unwrap().is_empty());
    }
}
