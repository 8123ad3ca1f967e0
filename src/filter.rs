//! Filter engine: categorical set membership and numeric percentile ranges, combined with AND.
//!
//! Percentile thresholds are always resolved against the dataset handed to
//! [`apply_filters`], never against a partially filtered intermediate, so the
//! thresholds of one range filter do not depend on the other filters.

use crate::dataset::Dataset;
use crate::error::{InsightError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Allowed values of a categorical filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// No explicit selection: every value present in the column is allowed.
    All,
    /// Only these values (compared by string form). Null cells never match.
    Only(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    Categorical {
        column: String,
        selection: Selection,
    },
    /// Keep rows whose value lies between the `low` and `high` percentiles (0..=100)
    /// of the column in the unfiltered dataset, bounds inclusive.
    PercentileRange { column: String, low: f64, high: f64 },
}

impl FilterSpec {
    pub fn categorical<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterSpec::Categorical {
            column: column.into(),
            selection: Selection::Only(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn all_values(column: impl Into<String>) -> Self {
        FilterSpec::Categorical {
            column: column.into(),
            selection: Selection::All,
        }
    }

    pub fn percentile_range(column: impl Into<String>, low: f64, high: f64) -> Self {
        FilterSpec::PercentileRange {
            column: column.into(),
            low,
            high,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FilterSpec::Categorical { column, .. } | FilterSpec::PercentileRange { column, .. } => {
                column
            }
        }
    }

    /// Parses `COL=VALUE[,VALUE...]`. Column names may contain spaces; the first `=` splits.
    pub fn parse_categorical(s: &str) -> Result<Self> {
        let (column, values) = split_column(s)?;
        let values: Vec<&str> = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return Err(InsightError::InvalidFilter(s.to_string()));
        }
        Ok(FilterSpec::categorical(column, values))
    }

    /// Parses `COL=LOW:HIGH` with percentages in 0..=100.
    pub fn parse_range(s: &str) -> Result<Self> {
        let (column, range) = split_column(s)?;
        let (low, high) = range
            .split_once(':')
            .ok_or_else(|| InsightError::InvalidFilter(s.to_string()))?;
        let low: f64 = low
            .trim()
            .parse()
            .map_err(|_| InsightError::InvalidFilter(s.to_string()))?;
        let high: f64 = high
            .trim()
            .parse()
            .map_err(|_| InsightError::InvalidFilter(s.to_string()))?;
        let spec = FilterSpec::percentile_range(column, low, high);
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if let FilterSpec::PercentileRange { column, low, high } = self {
            let in_bounds = |p: f64| p.is_finite() && (0.0..=100.0).contains(&p);
            if !in_bounds(*low) || !in_bounds(*high) || low > high {
                return Err(InsightError::InvalidPercentileRange {
                    column: column.clone(),
                    low: *low,
                    high: *high,
                });
            }
        }
        Ok(())
    }

    /// Checks the spec against the dataset schema without evaluating it.
    fn check_schema(&self, dataset: &Dataset) -> Result<()> {
        match self {
            FilterSpec::Categorical { column, .. } => dataset.require_column(column).map(|_| ()),
            FilterSpec::PercentileRange { column, .. } => dataset.require_numeric(column),
        }
    }

    /// Builds the row predicate; percentile thresholds come from `reference`.
    fn predicate(&self, reference: &Dataset) -> Result<Option<Expr>> {
        match self {
            FilterSpec::Categorical {
                selection: Selection::All,
                ..
            } => Ok(None),
            FilterSpec::Categorical {
                column,
                selection: Selection::Only(values),
            } => {
                let as_text = col(column.as_str()).cast(DataType::String);
                let expr = values
                    .iter()
                    .map(|v| as_text.clone().eq(lit(v.as_str())))
                    .reduce(|acc, e| acc.or(e))
                    .unwrap_or_else(|| lit(false));
                Ok(Some(expr))
            }
            FilterSpec::PercentileRange { column, low, high } => {
                let expr = match percentile_bounds(reference, column, *low, *high)? {
                    Some(bounds) => {
                        let value = col(column.as_str()).cast(DataType::Float64);
                        value
                            .clone()
                            .gt_eq(lit(bounds.low_value))
                            .and(value.lt_eq(lit(bounds.high_value)))
                    }
                    None => lit(false),
                };
                Ok(Some(expr))
            }
        }
    }
}

fn split_column(s: &str) -> Result<(&str, &str)> {
    let (column, rest) = s
        .split_once('=')
        .ok_or_else(|| InsightError::InvalidFilter(s.to_string()))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(InsightError::InvalidFilter(s.to_string()));
    }
    Ok((column, rest))
}

/// Percentile of already sorted values using linear interpolation between the
/// closest ranks. `pct` is in 0..=100. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Concrete value thresholds for a percentile range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileBounds {
    pub low_pct: f64,
    pub high_pct: f64,
    pub low_value: f64,
    pub high_value: f64,
}

/// Resolves a percentile range to value thresholds over the non-null values of
/// `column`. `None` when the column has no values at all.
pub fn percentile_bounds(
    dataset: &Dataset,
    column: &str,
    low: f64,
    high: f64,
) -> Result<Option<PercentileBounds>> {
    FilterSpec::percentile_range(column, low, high).validate()?;
    let mut values: Vec<f64> = dataset
        .numeric_values(column)?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(percentile(&values, low)
        .zip(percentile(&values, high))
        .map(|(low_value, high_value)| PercentileBounds {
            low_pct: low,
            high_pct: high,
            low_value,
            high_value,
        }))
}

/// Returns the rows of `dataset` that satisfy every spec.
///
/// Fails with `ColumnNotFound` / `NotNumeric` when a spec does not fit the
/// schema. With no specs the dataset is returned unchanged.
pub fn apply_filters(dataset: &Dataset, specs: &[FilterSpec]) -> Result<Dataset> {
    for spec in specs {
        spec.validate()?;
        spec.check_schema(dataset)?;
    }
    filter_with(dataset, specs.iter())
}

/// A spec that was not applied because the dataset lacks what it needs.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFilter {
    pub column: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub skipped: Vec<SkippedFilter>,
}

/// Like [`apply_filters`], but specs whose column is missing (or not numeric, for
/// range specs) are skipped and reported instead of failing the whole call.
pub fn apply_filters_lenient(dataset: &Dataset, specs: &[FilterSpec]) -> Result<FilterOutcome> {
    let mut applicable = Vec::with_capacity(specs.len());
    let mut skipped = Vec::new();
    for spec in specs {
        spec.validate()?;
        match spec.check_schema(dataset) {
            Ok(()) => applicable.push(spec),
            Err(e) if e.is_schema_gap() => {
                log::warn!("Skipping filter on '{}': {}", spec.column(), e);
                skipped.push(SkippedFilter {
                    column: spec.column().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(FilterOutcome {
        dataset: filter_with(dataset, applicable.into_iter())?,
        skipped,
    })
}

fn filter_with<'a>(
    dataset: &Dataset,
    specs: impl Iterator<Item = &'a FilterSpec>,
) -> Result<Dataset> {
    let mut final_expr: Option<Expr> = None;
    for spec in specs {
        if let Some(expr) = spec.predicate(dataset)? {
            final_expr = Some(match final_expr {
                Some(current) => current.and(expr),
                None => expr,
            });
        }
    }
    match final_expr {
        Some(e) => dataset.filter_rows(e),
        None => Ok(dataset.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::columns::*;

    fn ten_rows() -> Dataset {
        df!(
            REGION => &["North", "South", "North", "South", "North", "South", "North", "South", "North", "South"],
            UNITS_SOLD => &[10i64, 20, 30, 40, 50, 60, 70, 80, 90, 100],
            PRICE => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
        )
        .unwrap()
        .into()
    }

    #[test]
    fn percentile_linear_interpolation() {
        let v: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 50.0), Some(5.5));
        assert_eq!(percentile(&v, 100.0), Some(10.0));
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[4.0], 37.0), Some(4.0));
    }

    #[test]
    fn no_specs_is_identity() {
        let ds = ten_rows();
        assert_eq!(apply_filters(&ds, &[]).unwrap(), ds);
    }

    #[test]
    fn all_values_selection_is_identity() {
        let ds = ten_rows();
        let out = apply_filters(&ds, &[FilterSpec::all_values(REGION)]).unwrap();
        assert_eq!(out, ds);
    }

    #[test]
    fn percentile_lower_half() {
        let ds = ten_rows();
        let out = apply_filters(&ds, &[FilterSpec::percentile_range(PRICE, 0.0, 50.0)]).unwrap();
        let kept: Vec<f64> = out.numeric_values(PRICE).unwrap().into_iter().flatten().collect();
        assert_eq!(kept, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn empty_selection_keeps_nothing() {
        let ds = ten_rows();
        let spec = FilterSpec::categorical(REGION, Vec::<String>::new());
        assert_eq!(apply_filters(&ds, &[spec]).unwrap().height(), 0);
    }

    #[test]
    fn missing_column_fails_strict_and_skips_lenient() {
        let ds = ten_rows();
        let spec = FilterSpec::categorical(WEATHER_CONDITION, ["Sunny"]);
        assert!(matches!(
            apply_filters(&ds, std::slice::from_ref(&spec)),
            Err(InsightError::ColumnNotFound(_))
        ));
        let outcome = apply_filters_lenient(&ds, &[spec]).unwrap();
        assert_eq!(outcome.dataset.height(), 10);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].column, WEATHER_CONDITION);
    }

    #[test]
    fn range_on_text_column_is_not_numeric() {
        let ds = ten_rows();
        let spec = FilterSpec::percentile_range(REGION, 0.0, 100.0);
        assert!(matches!(
            apply_filters(&ds, &[spec]),
            Err(InsightError::NotNumeric { .. })
        ));
    }

    #[test]
    fn invalid_range_rejected() {
        let ds = ten_rows();
        for (low, high) in [(60.0, 40.0), (-1.0, 10.0), (0.0, 101.0)] {
            let spec = FilterSpec::percentile_range(PRICE, low, high);
            assert!(matches!(
                apply_filters(&ds, &[spec]),
                Err(InsightError::InvalidPercentileRange { .. })
            ));
        }
    }

    #[test]
    fn constant_column_degenerates_to_single_value() {
        let ds: Dataset = df!(PRICE => &[3.0f64, 3.0, 3.0]).unwrap().into();
        let bounds = percentile_bounds(&ds, PRICE, 10.0, 20.0).unwrap().unwrap();
        assert_eq!(bounds.low_value, 3.0);
        assert_eq!(bounds.high_value, 3.0);
        let out = apply_filters(&ds, &[FilterSpec::percentile_range(PRICE, 10.0, 20.0)]).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn all_null_column_keeps_no_rows() {
        let ds: Dataset = df!(PRICE => &[None::<f64>, None]).unwrap().into();
        assert!(percentile_bounds(&ds, PRICE, 0.0, 100.0).unwrap().is_none());
        let out = apply_filters(&ds, &[FilterSpec::percentile_range(PRICE, 0.0, 100.0)]).unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn thresholds_use_unfiltered_dataset() {
        let ds = ten_rows();
        // Units p50 over all rows is 55 (rows 1..=5), price p50 is 5.5 (rows 6..=10).
        // Resolving price against the narrowed rows would give 3 and keep rows 3..=5.
        let specs = [
            FilterSpec::percentile_range(UNITS_SOLD, 0.0, 50.0),
            FilterSpec::percentile_range(PRICE, 50.0, 100.0),
        ];
        let forward = apply_filters(&ds, &specs).unwrap();
        assert_eq!(forward.height(), 0);
        let reversed: Vec<FilterSpec> = specs.iter().rev().cloned().collect();
        assert_eq!(apply_filters(&ds, &reversed).unwrap().height(), 0);
    }

    #[test]
    fn categorical_does_not_shift_thresholds() {
        let ds = ten_rows();
        let specs = [
            FilterSpec::categorical(REGION, ["North"]),
            FilterSpec::percentile_range(PRICE, 0.0, 50.0),
        ];
        let forward = apply_filters(&ds, &specs).unwrap();
        let reversed: Vec<FilterSpec> = specs.iter().rev().cloned().collect();
        let backward = apply_filters(&ds, &reversed).unwrap();
        assert_eq!(forward, backward);
        let kept: Vec<f64> = forward.numeric_values(PRICE).unwrap().into_iter().flatten().collect();
        assert_eq!(kept, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn parse_specs() {
        assert_eq!(
            FilterSpec::parse_categorical("Product ID=P0001, P0002").unwrap(),
            FilterSpec::categorical(PRODUCT_ID, ["P0001", "P0002"])
        );
        assert_eq!(
            FilterSpec::parse_range("Price=10:90").unwrap(),
            FilterSpec::percentile_range(PRICE, 10.0, 90.0)
        );
        assert!(FilterSpec::parse_categorical("Region").is_err());
        assert!(FilterSpec::parse_categorical("Region=").is_err());
        assert!(FilterSpec::parse_range("Price=10").is_err());
        assert!(FilterSpec::parse_range("Price=90:10").is_err());
    }
}
