//! The session dataset: a uniform table with a fixed schema, addressed by column name.
//!
//! Optional columns are discovered with [`Dataset::has_column`] before any
//! optional computation; everything else reports [`InsightError::ColumnNotFound`].

use crate::error::{InsightError, Result};
use polars::prelude::*;

/// Column names of the retail inventory dataset.
pub mod columns {
    pub const DATE: &str = "Date";
    pub const REGION: &str = "Region";
    pub const CATEGORY: &str = "Category";
    pub const PRODUCT_ID: &str = "Product ID";
    pub const UNITS_SOLD: &str = "Units Sold";
    pub const INVENTORY_LEVEL: &str = "Inventory Level";
    pub const DEMAND_FORECAST: &str = "Demand Forecast";
    pub const PRICE: &str = "Price";
    pub const WEATHER_CONDITION: &str = "Weather Condition";
    pub const HOLIDAY_PROMOTION: &str = "Holiday/Promotion";

    /// Text columns offered as multi-select filters on the explorer page.
    pub const CATEGORICAL_FILTER_COLUMNS: &[&str] =
        &[REGION, CATEGORY, PRODUCT_ID, WEATHER_CONDITION];

    /// Numeric columns offered as percentile-range filters on the explorer page.
    pub const NUMERIC_FILTER_COLUMNS: &[&str] =
        &[INVENTORY_LEVEL, UNITS_SOLD, PRICE, DEMAND_FORECAST];
}

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Capability query consulted before every optional computation.
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.frame
            .column(name)
            .map_err(|_| InsightError::ColumnNotFound(name.to_string()))
    }

    pub fn dtype(&self, name: &str) -> Result<DataType> {
        Ok(self.require_column(name)?.dtype().clone())
    }

    /// Uses Polars' definition of numeric, so booleans and strings are excluded.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.frame
            .column(name)
            .map(|c| c.dtype().is_numeric())
            .unwrap_or(false)
    }

    pub fn require_numeric(&self, name: &str) -> Result<()> {
        let dtype = self.dtype(name)?;
        if dtype.is_numeric() {
            Ok(())
        } else {
            Err(InsightError::NotNumeric {
                column: name.to_string(),
                dtype: dtype.to_string(),
            })
        }
    }

    /// Names of all numeric columns in schema order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.frame
            .schema()
            .iter()
            .filter(|(_, dtype)| dtype.is_numeric())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Values of a numeric column as f64, nulls preserved.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.require_numeric(name)?;
        let series = self
            .require_column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.f64()?.into_iter().collect())
    }

    /// Values of any column in their string form (dates as `YYYY-MM-DD`), nulls preserved.
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self
            .require_column(name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Distinct non-null values of a column, sorted by the column's native ordering.
    pub fn distinct_values(&self, name: &str) -> Result<Vec<String>> {
        let series = self
            .require_column(name)?
            .as_materialized_series()
            .drop_nulls()
            .unique()?
            .sort(SortOptions::default())?
            .cast(&DataType::String)?;
        Ok(series.str()?.into_iter().flatten().map(str::to_string).collect())
    }

    pub fn head(&self, n: usize) -> Dataset {
        Dataset::new(self.frame.head(Some(n)))
    }

    /// Returns a new dataset with the rows matching `predicate`; `self` is left untouched.
    pub fn filter_rows(&self, predicate: Expr) -> Result<Dataset> {
        let frame = self.lazy().filter(predicate).collect()?;
        Ok(Dataset::new(frame))
    }
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Dataset::new(frame)
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}
