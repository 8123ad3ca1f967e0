use super::RowTable;
use crate::dataset::Dataset;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;

/// Rows shown as a load confirmation.
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewReport {
    pub source: Option<String>,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
    pub preview: RowTable,
}

pub fn overview(dataset: &Dataset, source: Option<&Path>) -> Result<OverviewReport> {
    let columns = dataset
        .column_names()
        .into_iter()
        .map(|name| {
            let dtype = dataset.dtype(&name)?.to_string();
            Ok(ColumnInfo { name, dtype })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OverviewReport {
        source: source.map(|p| p.display().to_string()),
        rows: dataset.height(),
        columns,
        preview: RowTable::from_dataset(dataset, PREVIEW_ROWS)?,
    })
}
