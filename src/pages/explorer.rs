use super::{optional, RowTable};
use crate::aggregate::{self, AggregationTable, GroupSum, Reduction};
use crate::config::AnalysisConfig;
use crate::dataset::columns::{
    CATEGORY, DATE, DEMAND_FORECAST, INVENTORY_LEVEL, PRICE, PRODUCT_ID, UNITS_SOLD,
};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{apply_filters_lenient, percentile_bounds, FilterSpec, PercentileBounds, SkippedFilter};
use serde::Serialize;

/// Resolved thresholds of one percentile-range filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threshold {
    pub column: String,
    /// `None` when the column has no values to take percentiles of.
    pub bounds: Option<PercentileBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub units_sold: f64,
    pub inventory_level: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerSummary {
    pub top_products: Option<Vec<GroupSum>>,
    pub units_by_category: Option<Vec<GroupSum>>,
    /// Per-date sums of units sold and demand forecast.
    pub trend: Option<AggregationTable>,
    pub scatter: Option<Vec<ScatterPoint>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerReport {
    /// Configured categorical filter columns present in the dataset.
    pub categorical_columns: Vec<String>,
    /// Configured percentile filter columns present (and numeric) in the dataset.
    pub numeric_columns: Vec<String>,
    pub total_rows: usize,
    pub matched_rows: usize,
    /// Share of all rows that matched, in percent; `None` for an empty dataset.
    pub matched_pct: Option<f64>,
    pub thresholds: Vec<Threshold>,
    pub skipped_filters: Vec<SkippedFilter>,
    /// The matching rows, limited by the row limit.
    pub filtered: RowTable,
    /// Omitted when no rows matched.
    pub summary: Option<ExplorerSummary>,
    pub warnings: Vec<String>,
}

/// Multi-condition explorer. Only filters on the configured explorer columns are
/// applied; percentile thresholds are taken from the unfiltered dataset.
pub fn explorer(
    dataset: &Dataset,
    filters: &[FilterSpec],
    analysis: &AnalysisConfig,
) -> Result<ExplorerReport> {
    let categorical_columns: Vec<String> = analysis
        .categorical_columns
        .iter()
        .filter(|c| dataset.has_column(c))
        .cloned()
        .collect();
    let numeric_columns: Vec<String> = analysis
        .numeric_columns
        .iter()
        .filter(|c| dataset.is_numeric(c))
        .cloned()
        .collect();

    let mut warnings = Vec::new();
    let mut applicable = Vec::with_capacity(filters.len());
    let mut skipped = Vec::new();
    for spec in filters {
        let allowed = match spec {
            FilterSpec::Categorical { .. } => &analysis.categorical_columns,
            FilterSpec::PercentileRange { .. } => &analysis.numeric_columns,
        };
        if allowed.iter().any(|c| c == spec.column()) {
            applicable.push(spec.clone());
        } else {
            log::warn!("'{}' is not an explorer filter column", spec.column());
            skipped.push(SkippedFilter {
                column: spec.column().to_string(),
                reason: "not an explorer filter column".to_string(),
            });
        }
    }

    let outcome = apply_filters_lenient(dataset, &applicable)?;
    skipped.extend(outcome.skipped);
    warnings.extend(
        skipped
            .iter()
            .map(|s| format!("Filter on {} skipped: {}", s.column, s.reason)),
    );
    let filtered = outcome.dataset;

    let mut thresholds = Vec::new();
    for spec in &applicable {
        if let FilterSpec::PercentileRange { column, low, high } = spec {
            if dataset.is_numeric(column) {
                thresholds.push(Threshold {
                    column: column.clone(),
                    bounds: percentile_bounds(dataset, column, *low, *high)?,
                });
            }
        }
    }

    let total_rows = dataset.height();
    let matched_rows = filtered.height();
    let summary = if filtered.is_empty() {
        None
    } else {
        Some(summarize(&filtered, analysis, &mut warnings)?)
    };

    Ok(ExplorerReport {
        categorical_columns,
        numeric_columns,
        total_rows,
        matched_rows,
        matched_pct: (total_rows > 0).then(|| matched_rows as f64 / total_rows as f64 * 100.0),
        thresholds,
        skipped_filters: skipped,
        filtered: RowTable::from_dataset(&filtered, analysis.row_limit)?,
        summary,
        warnings,
    })
}

fn summarize(
    filtered: &Dataset,
    analysis: &AnalysisConfig,
    warnings: &mut Vec<String>,
) -> Result<ExplorerSummary> {
    let top_products = optional(
        aggregate::top_n(filtered, PRODUCT_ID, UNITS_SOLD, analysis.top_n),
        "Top products",
        warnings,
    )?;
    let units_by_category = optional(
        aggregate::sum_by(filtered, CATEGORY, UNITS_SOLD),
        "Units by category",
        warnings,
    )?;
    let trend = if filtered.has_column(DATE) {
        optional(
            aggregate::aggregate_by(
                filtered,
                &[DATE],
                &[Reduction::sum(UNITS_SOLD), Reduction::sum(DEMAND_FORECAST)],
            ),
            "Sales vs forecast trend",
            warnings,
        )?
    } else {
        None
    };
    let scatter = optional(
        scatter_points(filtered, analysis.row_limit),
        "Price vs units scatter",
        warnings,
    )?;

    Ok(ExplorerSummary {
        top_products,
        units_by_category,
        trend,
        scatter,
    })
}

/// Price against units sold per row, rows with either value missing skipped.
fn scatter_points(dataset: &Dataset, limit: usize) -> Result<Vec<ScatterPoint>> {
    let prices = dataset.numeric_values(PRICE)?;
    let units = dataset.numeric_values(UNITS_SOLD)?;
    let text_or_nulls = |name: &str| -> Result<Vec<Option<String>>> {
        if dataset.has_column(name) {
            dataset.text_values(name)
        } else {
            Ok(vec![None; dataset.height()])
        }
    };
    let products = text_or_nulls(PRODUCT_ID)?;
    let categories = text_or_nulls(CATEGORY)?;
    let inventory = if dataset.is_numeric(INVENTORY_LEVEL) {
        dataset.numeric_values(INVENTORY_LEVEL)?
    } else {
        vec![None; dataset.height()]
    };

    Ok((0..dataset.height())
        .filter_map(|i| {
            Some(ScatterPoint {
                price: prices[i]?,
                units_sold: units[i]?,
                product_id: products[i].clone(),
                category: categories[i].clone(),
                inventory_level: inventory[i],
            })
        })
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::columns::{REGION, WEATHER_CONDITION};
    use polars::prelude::*;

    fn store() -> Dataset {
        df!(
            REGION => &["North", "South", "North", "South", "North", "South", "North", "South", "North", "South"],
            CATEGORY => &["Toys", "Toys", "Food", "Food", "Toys", "Toys", "Food", "Food", "Toys", "Toys"],
            PRODUCT_ID => &["P1", "P2", "P3", "P1", "P2", "P3", "P1", "P2", "P3", "P1"],
            WEATHER_CONDITION => &["Sunny", "Rainy", "Sunny", "Rainy", "Sunny", "Rainy", "Sunny", "Rainy", "Sunny", "Rainy"],
            UNITS_SOLD => &[1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            PRICE => &[10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]
        )
        .unwrap()
        .into()
    }

    #[test]
    fn no_filters_matches_everything() {
        let report = explorer(&store(), &[], &AnalysisConfig::default()).unwrap();
        assert_eq!(report.matched_rows, 10);
        assert_eq!(report.matched_pct, Some(100.0));
        assert_eq!(report.categorical_columns, vec![REGION, CATEGORY, PRODUCT_ID, WEATHER_CONDITION]);
        assert_eq!(report.numeric_columns, vec![UNITS_SOLD, PRICE]);
        let summary = report.summary.unwrap();
        // P1: 1+4+7+10, P2: 2+5+8, P3: 3+6+9
        let top = summary.top_products.unwrap();
        assert_eq!(top[0].group, "P1");
        assert_eq!(top[0].sum, 22.0);
        assert_eq!(summary.scatter.unwrap().len(), 10);
        // No Date column
        assert!(summary.trend.is_none());
    }

    #[test]
    fn lower_half_of_units() {
        let filters = [FilterSpec::percentile_range(UNITS_SOLD, 0.0, 50.0)];
        let report = explorer(&store(), &filters, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.matched_rows, 5);
        assert_eq!(report.matched_pct, Some(50.0));
        let bounds = report.thresholds[0].bounds.unwrap();
        assert_eq!(bounds.low_value, 1.0);
        assert_eq!(bounds.high_value, 5.5);

        assert_eq!(report.filtered.total_rows, 5);
        assert_eq!(report.filtered.rows.len(), 5);
        let units = report.filtered.columns.iter().position(|c| c == UNITS_SOLD).unwrap();
        let kept: Vec<Option<&str>> = report.filtered.rows.iter().map(|r| r[units].as_deref()).collect();
        assert_eq!(kept, vec![Some("1"), Some("2"), Some("3"), Some("4"), Some("5")]);
    }

    #[test]
    fn top_n_follows_config() {
        let analysis = AnalysisConfig {
            top_n: 2,
            ..AnalysisConfig::default()
        };
        let report = explorer(&store(), &[], &analysis).unwrap();
        assert_eq!(report.summary.unwrap().top_products.unwrap().len(), 2);
    }

    #[test]
    fn empty_match_omits_summary() {
        let filters = [FilterSpec::categorical(REGION, ["West"])];
        let report = explorer(&store(), &filters, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.matched_rows, 0);
        assert_eq!(report.matched_pct, Some(0.0));
        assert!(report.summary.is_none());
        assert_eq!(report.filtered.total_rows, 0);
        assert!(report.filtered.rows.is_empty());
    }

    #[test]
    fn filters_outside_explorer_columns_are_skipped() {
        let filters = [FilterSpec::categorical("Seasonality", ["Winter"])];
        let report = explorer(&store(), &filters, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.matched_rows, 10);
        assert_eq!(report.skipped_filters.len(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn absent_configured_column_is_skipped() {
        let filters = [FilterSpec::percentile_range(DEMAND_FORECAST, 10.0, 90.0)];
        let report = explorer(&store(), &filters, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.matched_rows, 10);
        assert!(report.thresholds.is_empty());
        assert_eq!(report.skipped_filters[0].column, DEMAND_FORECAST);
    }

    #[test]
    fn scatter_capped_by_row_limit() {
        let analysis = AnalysisConfig {
            row_limit: 3,
            ..AnalysisConfig::default()
        };
        let report = explorer(&store(), &[], &analysis).unwrap();
        let scatter = report.summary.unwrap().scatter.unwrap();
        assert_eq!(scatter.len(), 3);
        assert_eq!(scatter[0].price, 10.0);
        assert_eq!(scatter[0].product_id.as_deref(), Some("P1"));
        assert_eq!(report.filtered.rows.len(), 3);
        assert_eq!(report.filtered.total_rows, 10);
    }
}
