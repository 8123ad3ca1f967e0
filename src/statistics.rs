use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::percentile;
use serde::Serialize;
use std::collections::HashMap;

// Correlation matrix structures
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>, // Numeric column names
    /// Square, symmetric matrix of Pearson coefficients. `None` where the
    /// coefficient is undefined (fewer than 2 complete pairs, or zero variance).
    pub correlations: Vec<Vec<Option<f64>>>,
    pub sample_sizes: Vec<Vec<usize>>, // Complete (non-null) pairs per cell
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.correlations[i][j]
    }

    /// Off-diagonal pairs ordered by absolute coefficient, strongest first.
    pub fn strongest_pairs(&self) -> Vec<(String, String, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.columns.len() {
            for j in (i + 1)..self.columns.len() {
                if let Some(r) = self.correlations[i][j] {
                    pairs.push((self.columns[i].clone(), self.columns[j].clone(), r));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        pairs
    }
}

/// Computes pairwise Pearson correlation for all numeric columns.
///
/// Non-numeric columns are silently excluded. Each pair uses only rows where
/// both values are present.
pub fn correlation_matrix(dataset: &Dataset) -> Result<CorrelationMatrix> {
    let numeric_cols = dataset.numeric_columns();
    let values: Vec<Vec<Option<f64>>> = numeric_cols
        .iter()
        .map(|c| dataset.numeric_values(c))
        .collect::<Result<_>>()?;

    let n = numeric_cols.len();
    let mut correlations = vec![vec![None; n]; n];
    let mut sample_sizes = vec![vec![0; n]; n];

    for i in 0..n {
        for j in i..n {
            // Remove nulls for this pair
            let (xs, ys): (Vec<f64>, Vec<f64>) = values[i]
                .iter()
                .zip(values[j].iter())
                .filter_map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) if !a.is_nan() && !b.is_nan() => Some((*a, *b)),
                    _ => None,
                })
                .unzip();

            let mut correlation = pearson_correlation(&xs, &ys);
            if i == j {
                correlation = correlation.map(|_| 1.0);
            }
            correlations[i][j] = correlation;
            correlations[j][i] = correlation; // Symmetric
            sample_sizes[i][j] = xs.len();
            sample_sizes[j][i] = xs.len();
        }
    }

    Ok(CorrelationMatrix {
        columns: numeric_cols,
        correlations,
        sample_sizes,
    })
}

/// Pearson correlation of two equally long samples. `None` below two points or
/// when either side has zero variance.
pub fn pearson_correlation(values1: &[f64], values2: &[f64]) -> Option<f64> {
    if values1.len() != values2.len() || values1.len() < 2 {
        return None;
    }

    let mean1: f64 = values1.iter().sum::<f64>() / values1.len() as f64;
    let mean2: f64 = values2.iter().sum::<f64>() / values2.len() as f64;

    let numerator: f64 = values1
        .iter()
        .zip(values2.iter())
        .map(|(v1, v2)| (v1 - mean1) * (v2 - mean2))
        .sum();

    let var1: f64 = values1.iter().map(|v| (v - mean1).powi(2)).sum();
    let var2: f64 = values2.iter().map(|v| (v - mean2).powi(2)).sum();

    if var1 == 0.0 || var2 == 0.0 {
        return None;
    }

    Some((numerator / (var1.sqrt() * var2.sqrt())).clamp(-1.0, 1.0))
}

/// Five-number summary of one group, the data behind box and violin views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub group: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

impl GroupDistribution {
    fn from_values(group: String, mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();
        let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
        Self {
            group,
            count,
            mean,
            min: values.first().copied(),
            q1: percentile(&values, 25.0),
            median: percentile(&values, 50.0),
            q3: percentile(&values, 75.0),
            max: values.last().copied(),
        }
    }

    pub fn iqr(&self) -> Option<f64> {
        Some(self.q3? - self.q1?)
    }
}

/// Distribution of `value` within each group of `group`, groups in the column's
/// native order. Null values are ignored; rows with a null group are dropped.
pub fn distribution_by(
    dataset: &Dataset,
    group: &str,
    value: &str,
) -> Result<Vec<GroupDistribution>> {
    let keys = dataset.text_values(group)?;
    let values = dataset.numeric_values(value)?;

    let mut buckets: HashMap<String, Vec<f64>> = HashMap::new();
    for (key, v) in keys.into_iter().zip(values) {
        if let Some(key) = key {
            let bucket = buckets.entry(key).or_default();
            if let Some(v) = v.filter(|v| !v.is_nan()) {
                bucket.push(v);
            }
        }
    }

    Ok(dataset
        .distinct_values(group)?
        .into_iter()
        .map(|g| {
            let values = buckets.remove(&g).unwrap_or_default();
            GroupDistribution::from_values(g, values)
        })
        .collect())
}
