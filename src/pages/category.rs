use super::{optional, truncate_mean, RowTable};
use crate::aggregate::{self, AggregationTable, GroupSum, Reduction};
use crate::dataset::columns::{CATEGORY, DATE, INVENTORY_LEVEL, REGION, UNITS_SOLD};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{apply_filters, FilterSpec};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMetrics {
    pub total_units: Option<f64>,
    pub mean_inventory: Option<i64>,
    pub revenue: f64,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    /// Every category in the dataset, sorted.
    pub categories: Vec<String>,
    pub selected: Option<String>,
    pub metrics: CategoryMetrics,
    /// Per-date sum of units sold.
    pub trend: Option<AggregationTable>,
    pub units_by_region: Option<Vec<GroupSum>>,
    pub records: RowTable,
    pub warnings: Vec<String>,
}

/// Drill-down into one category. Defaults to the first category in sorted order;
/// a category that does not occur yields an empty selection.
pub fn category_analysis(
    dataset: &Dataset,
    selected: Option<&str>,
    row_limit: usize,
) -> Result<CategoryReport> {
    let categories = dataset.distinct_values(CATEGORY)?;
    let selected = selected
        .map(str::to_string)
        .or_else(|| categories.first().cloned());

    let subset = match &selected {
        Some(category) => apply_filters(
            dataset,
            &[FilterSpec::categorical(CATEGORY, [category.as_str()])],
        )?,
        None => dataset.head(0),
    };
    if let Some(category) = &selected {
        if !categories.contains(category) {
            log::warn!("Category '{}' does not occur in the dataset", category);
        }
    }

    let mut warnings = Vec::new();
    let total_units = optional(aggregate::total(&subset, UNITS_SOLD), "Total units", &mut warnings)?;
    let mean_inventory = optional(
        aggregate::mean(&subset, INVENTORY_LEVEL),
        "Mean inventory",
        &mut warnings,
    )?
    .and_then(truncate_mean);
    let revenue = optional(aggregate::revenue(&subset), "Revenue", &mut warnings)?.unwrap_or(0.0);
    let trend = optional(
        aggregate::aggregate_by(&subset, &[DATE], &[Reduction::sum(UNITS_SOLD)]),
        "Sales trend",
        &mut warnings,
    )?;
    let units_by_region = optional(
        aggregate::sum_by(&subset, REGION, UNITS_SOLD),
        "Units by region",
        &mut warnings,
    )?;

    Ok(CategoryReport {
        categories,
        selected,
        metrics: CategoryMetrics {
            total_units,
            mean_inventory,
            revenue,
            records: aggregate::count(&subset),
        },
        trend,
        units_by_region,
        records: RowTable::from_dataset(&subset, row_limit)?,
        warnings,
    })
}
