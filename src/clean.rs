//! Cleaning rules for the sales table and a read-only data-quality inspection
//!
//! The cleaner rewrites three columns in place: `sales_method` labels are
//! mapped to their canonical category, missing `revenue` is filled with the
//! per-method mean of observed revenue, and `years_as_customer` is capped.
//! No row is ever dropped.

use crate::data::{
    parse_methods, SalesMethod, SalesTable, CUSTOMER_ID, REVENUE, SALES_METHOD, STATE, WEEK,
    YEARS_AS_CUSTOMER,
};
use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

/// Year the company was founded
pub const FOUNDING_YEAR: i64 = 1984;
/// Year the analysis was run
pub const ANALYSIS_YEAR: i64 = 2023;
/// Nobody can have been a customer for longer than the company has existed
pub const MAX_TENURE: i64 = ANALYSIS_YEAR - FOUNDING_YEAR;
/// Six-week observation window after the product launch
pub const OBSERVATION_WEEKS: RangeInclusive<i64> = 1..=6;

/// Parameters of the cleaning pass
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningConfig {
    pub max_tenure: i64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_tenure: MAX_TENURE,
        }
    }
}

/// Revenue imputation outcome
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImputationSummary {
    /// Rows whose revenue was filled
    pub imputed: usize,
    /// Mean of observed revenue per method, computed before any fill
    pub group_means: Vec<(SalesMethod, f64)>,
}

/// What a cleaning pass changed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleaningReport {
    pub relabeled: usize,
    pub imputation: ImputationSummary,
    pub tenure_capped: usize,
}

impl CleaningReport {
    /// True when the pass rewrote nothing
    pub fn is_noop(&self) -> bool {
        self.relabeled == 0 && self.imputation.imputed == 0 && self.tenure_capped == 0
    }
}

/// Data-quality snapshot of a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QualityReport {
    pub rows: usize,
    pub duplicate_customers: usize,
    pub missing_revenue: usize,
    pub tenure_above_cap: usize,
    pub weeks_outside_window: usize,
    pub distinct_states: usize,
    /// Frequency of every `sales_method` label as it appears in the table
    pub method_labels: BTreeMap<String, usize>,
}

/// Run all cleaning rules on the table.
///
/// Labels are normalized first because imputation groups by the cleaned label.
pub fn clean(table: &mut SalesTable, config: &CleaningConfig) -> Result<CleaningReport> {
    let relabeled = normalize_methods(table)?;
    let imputation = impute_revenue(table)?;
    let tenure_capped = cap_tenure(table, config.max_tenure)?;

    let report = CleaningReport {
        relabeled,
        imputation,
        tenure_capped,
    };
    tracing::info!(
        relabeled = report.relabeled,
        imputed = report.imputation.imputed,
        tenure_capped = report.tenure_capped,
        "cleaning complete"
    );

    Ok(report)
}

/// Map every `sales_method` label to its canonical category.
///
/// Fails on the first label missing from the mapping table and leaves the
/// table untouched. Returns the number of labels rewritten.
pub fn normalize_methods(table: &mut SalesTable) -> Result<usize> {
    let methods = parse_methods(table.frame())?;

    let relabeled = table
        .frame()
        .column(SALES_METHOD)?
        .str()?
        .into_iter()
        .zip(&methods)
        .filter(|(raw, method)| *raw != Some(method.as_str()))
        .count();
    let labels: Vec<&'static str> = methods.iter().map(|method| method.as_str()).collect();

    table
        .frame_mut()
        .with_column(Series::new(SALES_METHOD.into(), labels))?;

    tracing::debug!(relabeled, "normalized sales method labels");
    Ok(relabeled)
}

/// Fill missing revenue with the mean observed revenue of the row's method.
///
/// Rows are grouped by their mapped method, so raw spellings of one method
/// share a mean. Group means come from one group-by over the table as it is
/// before any fill, so imputed values never feed back into a mean.
pub fn impute_revenue(table: &mut SalesTable) -> Result<ImputationSummary> {
    let methods = parse_methods(table.frame())?;
    let means = observed_revenue_means(table.frame(), &methods)?;

    let revenue = table.frame().column(REVENUE)?.f64()?;

    let mut imputed = 0;
    let mut filled = Vec::with_capacity(revenue.len());
    for (method, value) in methods.iter().zip(revenue.into_iter()) {
        match value {
            Some(value) => filled.push(value),
            None => {
                let mean = means
                    .get(method)
                    .copied()
                    .ok_or_else(|| AnalysisError::NoObservedRevenue {
                        method: method.to_string(),
                    })?;
                filled.push(mean);
                imputed += 1;
            }
        }
    }

    table
        .frame_mut()
        .with_column(Series::new(REVENUE.into(), filled))?;

    let mut group_means: Vec<(SalesMethod, f64)> = means.into_iter().collect();
    group_means.sort_by_key(|(method, _)| *method);

    tracing::debug!(imputed, "imputed missing revenue");
    Ok(ImputationSummary {
        imputed,
        group_means,
    })
}

/// Mean of non-missing revenue per mapped method. Methods with no observed
/// revenue are absent from the map.
fn observed_revenue_means(
    frame: &DataFrame,
    methods: &[SalesMethod],
) -> Result<HashMap<SalesMethod, f64>> {
    let labels: Vec<&'static str> = methods.iter().map(|method| method.as_str()).collect();
    let mut revenue = frame.select([REVENUE])?;
    revenue.with_column(Series::new(SALES_METHOD.into(), labels))?;

    let grouped = revenue
        .lazy()
        .group_by([col(SALES_METHOD)])
        .agg([col(REVENUE).mean().alias("mean_revenue")])
        .collect()?;

    let group_methods = parse_methods(&grouped)?;
    let means = grouped.column("mean_revenue")?.f64()?;

    let out = group_methods
        .into_iter()
        .zip(means.into_iter())
        .filter_map(|(method, mean)| mean.map(|mean| (method, mean)))
        .collect();

    Ok(out)
}

/// Clamp `years_as_customer` to `max_tenure`. Returns the number of rows capped.
pub fn cap_tenure(table: &mut SalesTable, max_tenure: i64) -> Result<usize> {
    let capped = table
        .frame()
        .column(YEARS_AS_CUSTOMER)?
        .i64()?
        .into_no_null_iter()
        .filter(|years| *years > max_tenure)
        .count();

    if capped > 0 {
        let frame = table
            .frame()
            .clone()
            .lazy()
            .with_column(
                when(col(YEARS_AS_CUSTOMER).gt(lit(max_tenure)))
                    .then(lit(max_tenure))
                    .otherwise(col(YEARS_AS_CUSTOMER))
                    .alias(YEARS_AS_CUSTOMER),
            )
            .collect()?;
        *table.frame_mut() = frame;
    }

    tracing::debug!(capped, max_tenure, "capped customer tenure");
    Ok(capped)
}

/// Summarize the table's quality without changing it
pub fn inspect(table: &SalesTable, config: &CleaningConfig) -> Result<QualityReport> {
    let counts = table
        .frame()
        .clone()
        .lazy()
        .select([
            len().alias("rows"),
            col(CUSTOMER_ID).n_unique().alias("unique_customers"),
            col(REVENUE).null_count().alias("missing_revenue"),
            col(YEARS_AS_CUSTOMER)
                .gt(lit(config.max_tenure))
                .sum()
                .alias("tenure_above_cap"),
            col(WEEK)
                .lt(lit(*OBSERVATION_WEEKS.start()))
                .or(col(WEEK).gt(lit(*OBSERVATION_WEEKS.end())))
                .sum()
                .alias("weeks_outside_window"),
            col(STATE).n_unique().alias("distinct_states"),
        ])
        .collect()?;

    let count = |name: &str| -> Result<usize> {
        let value = counts
            .column(name)?
            .cast(&DataType::UInt64)?
            .u64()?
            .get(0)
            .unwrap_or(0);
        Ok(value as usize)
    };

    let rows = count("rows")?;
    let mut report = QualityReport {
        rows,
        duplicate_customers: rows - count("unique_customers")?,
        missing_revenue: count("missing_revenue")?,
        tenure_above_cap: count("tenure_above_cap")?,
        weeks_outside_window: count("weeks_outside_window")?,
        distinct_states: count("distinct_states")?,
        method_labels: BTreeMap::new(),
    };

    let labels = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(SALES_METHOD)])
        .agg([len().alias("count")])
        .collect()?;
    let names = labels.column(SALES_METHOD)?.str()?;
    let frequencies = labels.column("count")?.cast(&DataType::UInt64)?;
    for (label, frequency) in names.into_iter().zip(frequencies.u64()?.into_iter()) {
        if let (Some(label), Some(frequency)) = (label, frequency) {
            report
                .method_labels
                .insert(label.to_string(), frequency as usize);
        }
    }

    if report.duplicate_customers > 0 {
        tracing::warn!(
            duplicates = report.duplicate_customers,
            column = CUSTOMER_ID,
            "duplicate customer ids"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NB_SITE_VISITS, NB_SOLD};

    fn create_test_table() -> SalesTable {
        let df = polars::df!(
            WEEK => [1i64, 2, 3, 4, 5, 6],
            SALES_METHOD => ["Email", "email", "Email", "Call", "em + call", "Email + Call"],
            CUSTOMER_ID => ["a", "b", "c", "d", "e", "f"],
            NB_SOLD => [9i64, 10, 8, 7, 14, 15],
            REVENUE => [Some(100.0), Some(200.0), None, Some(50.0), None, Some(180.0)],
            YEARS_AS_CUSTOMER => [10i64, 47, 39, 63, 0, 2],
            NB_SITE_VISITS => [24i64, 26, 22, 21, 30, 31],
            STATE => ["Ohio", "Texas", "Ohio", "Utah", "Iowa", "Iowa"]
        )
        .unwrap();
        SalesTable::from_frame(df).unwrap()
    }

    fn column_i64(table: &SalesTable, name: &str) -> Vec<i64> {
        table
            .frame()
            .column(name)
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_normalize_methods() {
        let mut table = create_test_table();
        let relabeled = normalize_methods(&mut table).unwrap();

        assert_eq!(relabeled, 2);
        let labels: Vec<String> = table
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.sales_method)
            .collect();
        assert_eq!(
            labels,
            vec!["Email", "Email", "Email", "Call", "Email + Call", "Email + Call"]
        );
    }

    #[test]
    fn test_unmapped_label_fails_and_keeps_table() {
        let df = polars::df!(
            WEEK => [1i64, 1],
            SALES_METHOD => ["Email", "Fax"],
            CUSTOMER_ID => ["a", "b"],
            NB_SOLD => [9i64, 10],
            REVENUE => [Some(100.0), Some(80.0)],
            YEARS_AS_CUSTOMER => [1i64, 2],
            NB_SITE_VISITS => [24i64, 26],
            STATE => ["Ohio", "Texas"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();

        let err = normalize_methods(&mut table).unwrap_err();
        assert!(matches!(err, AnalysisError::UnmappedCategory { row: 1, ref value } if value == "Fax"));
        assert_eq!(table.records().unwrap()[1].sales_method, "Fax");
    }

    #[test]
    fn test_impute_uses_group_mean_of_observed_revenue() {
        let mut table = create_test_table();
        normalize_methods(&mut table).unwrap();
        let summary = impute_revenue(&mut table).unwrap();

        assert_eq!(summary.imputed, 2);
        let records = table.records().unwrap();
        // Email observed: 100, 200
        assert_eq!(records[2].revenue, Some(150.0));
        // Email + Call observed: 180
        assert_eq!(records[4].revenue, Some(180.0));
        assert!(records.iter().all(|r| r.revenue.is_some()));
        assert!(summary
            .group_means
            .contains(&(SalesMethod::Email, 150.0)));
    }

    #[test]
    fn test_impute_pools_raw_spellings_of_one_method() {
        let df = polars::df!(
            WEEK => [1i64, 2, 3],
            SALES_METHOD => ["Email", "email", "Email"],
            CUSTOMER_ID => ["a", "b", "c"],
            NB_SOLD => [9i64, 10, 8],
            REVENUE => [Some(100.0), Some(200.0), None],
            YEARS_AS_CUSTOMER => [1i64, 2, 3],
            NB_SITE_VISITS => [24i64, 26, 22],
            STATE => ["Ohio", "Texas", "Ohio"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();

        // Labels are left raw: "email" must still count towards Email
        let summary = impute_revenue(&mut table).unwrap();

        assert_eq!(summary.imputed, 1);
        assert_eq!(summary.group_means, vec![(SalesMethod::Email, 150.0)]);
        assert_eq!(table.records().unwrap()[2].revenue, Some(150.0));
    }

    #[test]
    fn test_clean_maps_compact_combined_label() {
        let df = polars::df!(
            WEEK => [1i64, 2, 3],
            SALES_METHOD => ["Email+Call", " Email + Call ", "Call"],
            CUSTOMER_ID => ["a", "b", "c"],
            NB_SOLD => [14i64, 15, 8],
            REVENUE => [Some(190.0), None, Some(45.0)],
            YEARS_AS_CUSTOMER => [1i64, 2, 3],
            NB_SITE_VISITS => [30i64, 31, 22],
            STATE => ["Ohio", "Texas", "Ohio"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();

        let report = clean(&mut table, &CleaningConfig::default()).unwrap();

        assert_eq!(report.relabeled, 2);
        let records = table.records().unwrap();
        assert_eq!(records[0].sales_method, "Email + Call");
        assert_eq!(records[1].sales_method, "Email + Call");
        assert_eq!(records[1].revenue, Some(190.0));
    }

    #[test]
    fn test_impute_without_observed_revenue_fails() {
        let df = polars::df!(
            WEEK => [1i64, 2],
            SALES_METHOD => ["Email", "Call"],
            CUSTOMER_ID => ["a", "b"],
            NB_SOLD => [9i64, 10],
            REVENUE => [Some(100.0), None],
            YEARS_AS_CUSTOMER => [1i64, 2],
            NB_SITE_VISITS => [24i64, 26],
            STATE => ["Ohio", "Texas"]
        )
        .unwrap();
        let mut table = SalesTable::from_frame(df).unwrap();

        let result = impute_revenue(&mut table);
        assert!(matches!(result, Err(AnalysisError::NoObservedRevenue { .. })));
    }

    #[test]
    fn test_cap_tenure() {
        let mut table = create_test_table();
        let capped = cap_tenure(&mut table, MAX_TENURE).unwrap();

        assert_eq!(capped, 2);
        assert_eq!(
            column_i64(&table, YEARS_AS_CUSTOMER),
            vec![10, 39, 39, 39, 0, 2]
        );
    }

    #[test]
    fn test_max_tenure_derivation() {
        assert_eq!(MAX_TENURE, 39);
        assert_eq!(CleaningConfig::default().max_tenure, 39);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let mut table = create_test_table();
        let config = CleaningConfig::default();

        let first = clean(&mut table, &config).unwrap();
        assert!(!first.is_noop());
        let after_first = table.records().unwrap();

        let second = clean(&mut table, &config).unwrap();
        assert!(second.is_noop());
        assert_eq!(table.records().unwrap(), after_first);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_inspect_before_and_after_cleaning() {
        let mut table = create_test_table();
        let config = CleaningConfig::default();

        let before = inspect(&table, &config).unwrap();
        assert_eq!(before.rows, 6);
        assert_eq!(before.duplicate_customers, 0);
        assert_eq!(before.missing_revenue, 2);
        assert_eq!(before.tenure_above_cap, 2);
        assert_eq!(before.weeks_outside_window, 0);
        assert_eq!(before.distinct_states, 4);
        assert_eq!(before.method_labels.len(), 5);

        clean(&mut table, &config).unwrap();
        let after = inspect(&table, &config).unwrap();
        assert_eq!(after.missing_revenue, 0);
        assert_eq!(after.tenure_above_cap, 0);
        assert_eq!(after.method_labels.len(), 3);
        assert_eq!(after.method_labels.values().sum::<usize>(), 6);
    }
}
