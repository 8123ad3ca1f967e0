//! Aggregation engine: grouped and ungrouped reductions over a (filtered) dataset.
//!
//! Grouped results are ordered by the group columns' native ordering (dates
//! chronologically, numbers numerically, text lexically); rows with a null
//! group key are dropped. All functions are pure and independent of input row order.

use crate::dataset::columns::{
    DEMAND_FORECAST, HOLIDAY_PROMOTION, INVENTORY_LEVEL, PRICE, UNITS_SOLD,
};
use crate::dataset::Dataset;
use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;

/// Column added by [`promotion_labels`].
pub const PROMOTION_LABEL: &str = "Promotion Label";
pub const PROMOTION_ON: &str = "Promotion ON";
pub const NORMAL_DAY: &str = "Normal Day";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "column", rename_all = "snake_case")]
pub enum Reduction {
    /// Sum of the column; nulls skipped, 0 for an empty group.
    Sum(String),
    /// Mean of the column; `None` when the group has no non-null values.
    Mean(String),
    /// Number of rows in the group.
    Count,
}

impl Reduction {
    pub fn sum(column: &str) -> Self {
        Reduction::Sum(column.to_string())
    }

    pub fn mean(column: &str) -> Self {
        Reduction::Mean(column.to_string())
    }

    pub fn label(&self) -> String {
        match self {
            Reduction::Sum(c) => format!("sum({})", c),
            Reduction::Mean(c) => format!("mean({})", c),
            Reduction::Count => "count".to_string(),
        }
    }

    fn expr(&self) -> Expr {
        match self {
            Reduction::Sum(c) => col(c.as_str()).cast(DataType::Float64).sum(),
            Reduction::Mean(c) => col(c.as_str()).cast(DataType::Float64).mean(),
            Reduction::Count => len(),
        }
    }

    fn check(&self, dataset: &Dataset) -> Result<()> {
        match self {
            Reduction::Sum(c) | Reduction::Mean(c) => dataset.require_numeric(c),
            Reduction::Count => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationRow {
    /// One entry per group column, in string form.
    pub key: Vec<String>,
    /// One entry per reduction, in request order.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationTable {
    pub group_columns: Vec<String>,
    pub value_labels: Vec<String>,
    pub rows: Vec<AggregationRow>,
}

impl AggregationTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups by `groups` and computes every reduction per group in one pass.
/// With no group columns the result has exactly one row with an empty key.
pub fn aggregate_by(
    dataset: &Dataset,
    groups: &[&str],
    reductions: &[Reduction],
) -> Result<AggregationTable> {
    for g in groups {
        dataset.require_column(g)?;
    }
    for r in reductions {
        r.check(dataset)?;
    }

    let aliases: Vec<String> = (0..reductions.len()).map(|i| format!("__agg{}", i)).collect();
    let aggs: Vec<Expr> = reductions
        .iter()
        .zip(&aliases)
        .map(|(r, alias)| r.expr().alias(alias.as_str()))
        .collect();

    let mut lf = dataset.lazy();
    let out = if groups.is_empty() {
        lf.select(aggs).collect()?
    } else {
        for g in groups {
            lf = lf.filter(col(*g).is_not_null());
        }
        let keys: Vec<Expr> = groups.iter().map(|g| col(*g)).collect();
        let options = SortMultipleOptions {
            descending: vec![false; groups.len()],
            ..Default::default()
        };
        lf.group_by(keys.clone())
            .agg(aggs)
            .sort_by_exprs(keys, options)
            .collect()?
    };

    let out = Dataset::new(out);
    let key_columns: Vec<Vec<Option<String>>> = groups
        .iter()
        .map(|g| out.text_values(g))
        .collect::<Result<_>>()?;
    let value_columns: Vec<Vec<Option<f64>>> = aliases
        .iter()
        .map(|a| out.numeric_values(a))
        .collect::<Result<_>>()?;

    let rows = (0..out.height())
        .map(|i| AggregationRow {
            key: key_columns
                .iter()
                .map(|c| c[i].clone().unwrap_or_default())
                .collect(),
            values: value_columns.iter().map(|c| c[i]).collect(),
        })
        .collect();

    Ok(AggregationTable {
        group_columns: groups.iter().map(|g| g.to_string()).collect(),
        value_labels: reductions.iter().map(Reduction::label).collect(),
        rows,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSum {
    pub group: String,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    /// `None` when every value in the group is null.
    pub mean: Option<f64>,
    pub rows: usize,
}

pub fn sum_by(dataset: &Dataset, group: &str, value: &str) -> Result<Vec<GroupSum>> {
    let table = aggregate_by(dataset, &[group], &[Reduction::sum(value)])?;
    Ok(table
        .rows
        .into_iter()
        .map(|row| GroupSum {
            group: row.key.into_iter().next().unwrap_or_default(),
            sum: row.values[0].unwrap_or(0.0),
        })
        .collect())
}

pub fn mean_by(dataset: &Dataset, group: &str, value: &str) -> Result<Vec<GroupMean>> {
    let table = aggregate_by(dataset, &[group], &[Reduction::mean(value), Reduction::Count])?;
    Ok(table
        .rows
        .into_iter()
        .map(|row| GroupMean {
            group: row.key.into_iter().next().unwrap_or_default(),
            mean: row.values[0],
            rows: row.values[1].unwrap_or(0.0) as usize,
        })
        .collect())
}

pub fn count(dataset: &Dataset) -> usize {
    dataset.height()
}

/// Ungrouped sum; 0 for an empty dataset.
pub fn total(dataset: &Dataset, column: &str) -> Result<f64> {
    let table = aggregate_by(dataset, &[], &[Reduction::sum(column)])?;
    Ok(table
        .rows
        .first()
        .and_then(|r| r.values[0])
        .unwrap_or(0.0))
}

/// Ungrouped mean; `None` when there are no non-null values.
pub fn mean(dataset: &Dataset, column: &str) -> Result<Option<f64>> {
    let table = aggregate_by(dataset, &[], &[Reduction::mean(column)])?;
    Ok(table.rows.first().and_then(|r| r.values[0]))
}

/// Rows whose inventory level is below the demand forecast.
pub fn stockout_risk(dataset: &Dataset) -> Result<Dataset> {
    dataset.require_numeric(INVENTORY_LEVEL)?;
    dataset.require_numeric(DEMAND_FORECAST)?;
    dataset.filter_rows(
        col(INVENTORY_LEVEL)
            .cast(DataType::Float64)
            .lt(col(DEMAND_FORECAST).cast(DataType::Float64)),
    )
}

/// Σ(Units Sold × Price). 0 when either column is absent from the schema.
pub fn revenue(dataset: &Dataset) -> Result<f64> {
    if !dataset.has_column(PRICE) || !dataset.has_column(UNITS_SOLD) {
        return Ok(0.0);
    }
    dataset.require_numeric(PRICE)?;
    dataset.require_numeric(UNITS_SOLD)?;
    let out = dataset
        .lazy()
        .select([(col(UNITS_SOLD).cast(DataType::Float64)
            * col(PRICE).cast(DataType::Float64))
        .sum()
        .alias("revenue")])
        .collect()?;
    Ok(Dataset::new(out)
        .numeric_values("revenue")?
        .first()
        .copied()
        .flatten()
        .unwrap_or(0.0))
}

/// Groups ranked by summed `value`, descending, at most `n` entries.
/// Ties are broken by group label ascending.
pub fn top_n(dataset: &Dataset, group: &str, value: &str, n: usize) -> Result<Vec<GroupSum>> {
    let mut sums = sum_by(dataset, group, value)?;
    sums.sort_by(|a, b| b.sum.total_cmp(&a.sum).then_with(|| a.group.cmp(&b.group)));
    sums.truncate(n);
    Ok(sums)
}

/// Adds [`PROMOTION_LABEL`]: "Promotion ON" where `Holiday/Promotion == 1`, else "Normal Day".
pub fn promotion_labels(dataset: &Dataset) -> Result<Dataset> {
    dataset.require_numeric(HOLIDAY_PROMOTION)?;
    let frame = dataset
        .lazy()
        .with_column(
            when(col(HOLIDAY_PROMOTION).cast(DataType::Float64).eq(lit(1.0)))
                .then(lit(PROMOTION_ON))
                .otherwise(lit(NORMAL_DAY))
                .alias(PROMOTION_LABEL),
        )
        .collect()?;
    Ok(Dataset::new(frame))
}
