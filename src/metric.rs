//! ARPSE: average revenue per sales effort

use crate::aggregate::MethodSummary;
use crate::data::SalesMethod;
use crate::error::{AnalysisError, Result};

/// Fixed relative labor cost of each outreach method
pub fn effort_weight(method: SalesMethod) -> f64 {
    match method {
        SalesMethod::Email => 0.5,
        SalesMethod::Call => 3.0,
        SalesMethod::EmailAndCall => 1.0,
    }
}

/// ARPSE of one method
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub method: SalesMethod,
    pub total_revenue: f64,
    pub customers: usize,
    pub effort_weight: f64,
    pub arpse: f64,
}

/// total_revenue / (customers * effort_weight)
///
/// # Errors
/// * `ZeroDenominator` when there are no customers or the weight is not a
///   positive finite number
pub fn arpse(
    method: SalesMethod,
    total_revenue: f64,
    customers: usize,
    effort_weight: f64,
) -> Result<f64> {
    if customers == 0 || !effort_weight.is_finite() || effort_weight <= 0.0 {
        return Err(AnalysisError::ZeroDenominator {
            method: method.to_string(),
            customers,
            effort_weight,
        });
    }

    Ok(total_revenue / (customers as f64 * effort_weight))
}

/// Compute ARPSE for every method summary, keeping the input order
pub fn compute_arpse(summaries: &[MethodSummary]) -> Result<Vec<MetricRow>> {
    summaries
        .iter()
        .map(|summary| {
            let weight = effort_weight(summary.method);
            let value = arpse(summary.method, summary.total_revenue, summary.customers, weight)?;
            tracing::debug!(method = %summary.method, arpse = value, "computed arpse");

            Ok(MetricRow {
                method: summary.method,
                total_revenue: summary.total_revenue,
                customers: summary.customers,
                effort_weight: weight,
                arpse: value,
            })
        })
        .collect()
}

/// The method that earns the most per unit of effort
pub fn best_method(rows: &[MetricRow]) -> Option<&MetricRow> {
    rows.iter().max_by(|a, b| a.arpse.total_cmp(&b.arpse))
}
