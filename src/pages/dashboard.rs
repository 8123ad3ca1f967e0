use super::{optional, truncate_mean, RowTable};
use crate::aggregate::{self, AggregationTable, GroupSum, Reduction};
use crate::dataset::columns::{CATEGORY, DATE, INVENTORY_LEVEL, PRICE, REGION, UNITS_SOLD};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{apply_filters_lenient, FilterSpec, Selection, SkippedFilter};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_units: Option<f64>,
    /// Mean inventory level truncated to an integer; `None` when undefined.
    pub mean_inventory: Option<i64>,
    pub stockout_rows: Option<usize>,
    /// 0 when the dataset has no `Price` column or no prices.
    pub mean_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub skipped_filters: Vec<SkippedFilter>,
    pub metrics: DashboardMetrics,
    /// Per-date sums of units sold and inventory level.
    pub trend: Option<AggregationTable>,
    pub units_by_category: Option<Vec<GroupSum>>,
    /// The filtered rows themselves, limited by the row limit.
    pub filtered: RowTable,
    pub stockout: Option<RowTable>,
    pub warnings: Vec<String>,
}

pub fn dashboard(
    dataset: &Dataset,
    regions: &Selection,
    categories: &Selection,
    row_limit: usize,
) -> Result<DashboardReport> {
    let specs = [
        FilterSpec::Categorical {
            column: REGION.to_string(),
            selection: regions.clone(),
        },
        FilterSpec::Categorical {
            column: CATEGORY.to_string(),
            selection: categories.clone(),
        },
    ];
    let outcome = apply_filters_lenient(dataset, &specs)?;
    let filtered = &outcome.dataset;
    let mut warnings: Vec<String> = outcome
        .skipped
        .iter()
        .map(|s| format!("Filter on {} skipped: {}", s.column, s.reason))
        .collect();

    let total_units = optional(aggregate::total(filtered, UNITS_SOLD), "Total units", &mut warnings)?;
    let mean_inventory = optional(
        aggregate::mean(filtered, INVENTORY_LEVEL),
        "Mean inventory",
        &mut warnings,
    )?
    .and_then(truncate_mean);
    let stockout = optional(aggregate::stockout_risk(filtered), "Stockout risk", &mut warnings)?;
    let mean_price = if filtered.has_column(PRICE) {
        optional(aggregate::mean(filtered, PRICE), "Mean price", &mut warnings)?
            .flatten()
            .unwrap_or(0.0)
    } else {
        0.0
    };

    let trend = optional(
        aggregate::aggregate_by(
            filtered,
            &[DATE],
            &[Reduction::sum(UNITS_SOLD), Reduction::sum(INVENTORY_LEVEL)],
        ),
        "Sales trend",
        &mut warnings,
    )?;
    let units_by_category = optional(
        aggregate::sum_by(filtered, CATEGORY, UNITS_SOLD),
        "Units by category",
        &mut warnings,
    )?;

    Ok(DashboardReport {
        total_rows: dataset.height(),
        filtered_rows: filtered.height(),
        skipped_filters: outcome.skipped,
        metrics: DashboardMetrics {
            total_units,
            mean_inventory,
            stockout_rows: stockout.as_ref().map(Dataset::height),
            mean_price,
        },
        trend,
        units_by_category,
        filtered: RowTable::from_dataset(filtered, row_limit)?,
        stockout: stockout
            .map(|s| RowTable::from_dataset(&s, row_limit))
            .transpose()?,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::columns::DEMAND_FORECAST;
    use polars::prelude::*;
    use std::collections::BTreeSet;

    fn store() -> Dataset {
        df!(
            DATE => &["2022-01-01", "2022-01-01", "2022-01-02", "2022-01-02"],
            REGION => &["North", "South", "North", "South"],
            CATEGORY => &["Toys", "Food", "Food", "Toys"],
            UNITS_SOLD => &[10i64, 20, 30, 40],
            INVENTORY_LEVEL => &[5i64, 50, 25, 100],
            DEMAND_FORECAST => &[10.0f64, 15.0, 30.0, 35.0]
        )
        .unwrap()
        .into()
    }

    fn only(values: &[&str]) -> Selection {
        Selection::Only(values.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn unfiltered_metrics() {
        let report = dashboard(&store(), &Selection::All, &Selection::All, 100).unwrap();
        assert_eq!(report.filtered_rows, 4);
        assert_eq!(report.metrics.total_units, Some(100.0));
        assert_eq!(report.metrics.mean_inventory, Some(45));
        assert_eq!(report.metrics.stockout_rows, Some(2));
        // No Price column
        assert_eq!(report.metrics.mean_price, 0.0);
        assert!(report.warnings.is_empty());

        let trend = report.trend.unwrap();
        assert_eq!(trend.rows.len(), 2);
        assert_eq!(trend.rows[0].key, vec!["2022-01-01"]);
        assert_eq!(trend.rows[0].values, vec![Some(30.0), Some(55.0)]);
    }

    #[test]
    fn region_filter_narrows_everything() {
        let report = dashboard(&store(), &only(&["North"]), &Selection::All, 100).unwrap();
        assert_eq!(report.filtered_rows, 2);
        assert_eq!(report.metrics.total_units, Some(40.0));
        let shares = report.units_by_category.unwrap();
        assert_eq!(shares[0].group, "Food");
        assert_eq!(shares[0].sum, 30.0);
        assert_eq!(shares[1].group, "Toys");

        assert_eq!(report.filtered.total_rows, 2);
        assert_eq!(report.filtered.rows.len(), 2);
        let region = report.filtered.columns.iter().position(|c| c == REGION).unwrap();
        assert!(report
            .filtered
            .rows
            .iter()
            .all(|row| row[region].as_deref() == Some("North")));
    }

    #[test]
    fn filtered_table_limited() {
        let report = dashboard(&store(), &Selection::All, &Selection::All, 3).unwrap();
        assert_eq!(report.filtered.total_rows, 4);
        assert_eq!(report.filtered.rows.len(), 3);
        assert!(report.filtered.is_truncated());
    }

    #[test]
    fn empty_selection_yields_empty_metrics() {
        let report = dashboard(&store(), &only(&["West"]), &Selection::All, 100).unwrap();
        assert_eq!(report.filtered_rows, 0);
        assert_eq!(report.metrics.total_units, Some(0.0));
        assert_eq!(report.metrics.mean_inventory, None);
        assert!(report.trend.unwrap().is_empty());
    }

    #[test]
    fn stockout_table_limited() {
        let report = dashboard(&store(), &Selection::All, &Selection::All, 1).unwrap();
        let table = report.stockout.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.total_rows, 2);
    }

    #[test]
    fn missing_region_column_is_reported() {
        let ds: Dataset = store().into_frame().drop(REGION).unwrap().into();
        let report = dashboard(&ds, &only(&["North"]), &Selection::All, 10).unwrap();
        assert_eq!(report.filtered_rows, 4);
        assert_eq!(report.skipped_filters.len(), 1);
        assert_eq!(report.skipped_filters[0].column, REGION);
        assert_eq!(report.warnings.len(), 1);
    }
}
