#![allow(dead_code)]

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use stockscope::dataset::columns::*;
use stockscope::Dataset;
use tempfile::TempDir;

/// Ten rows: two regions alternating, units 10..=100, prices 1..=10.
pub fn ten_row_store() -> Dataset {
    df!(
        DATE => &[
            "2022-01-01", "2022-01-01", "2022-01-02", "2022-01-02", "2022-01-03",
            "2022-01-03", "2022-01-04", "2022-01-04", "2022-01-05", "2022-01-05",
        ],
        REGION => &["North", "South", "North", "South", "North", "South", "North", "South", "North", "South"],
        CATEGORY => &["Toys", "Food", "Food", "Toys", "Toys", "Food", "Food", "Toys", "Toys", "Food"],
        PRODUCT_ID => &["P1", "P2", "P3", "P4", "P1", "P2", "P3", "P4", "P1", "P2"],
        UNITS_SOLD => &[10i64, 20, 30, 40, 50, 60, 70, 80, 90, 100],
        INVENTORY_LEVEL => &[5i64, 50, 25, 100, 45, 70, 65, 20, 95, 150],
        DEMAND_FORECAST => &[10.0f64, 15.0, 30.0, 35.0, 40.0, 80.0, 60.0, 90.0, 100.0, 95.0],
        PRICE => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        WEATHER_CONDITION => &["Sunny", "Rainy", "Sunny", "Snowy", "Cloudy", "Sunny", "Rainy", "Sunny", "Cloudy", "Snowy"],
        HOLIDAY_PROMOTION => &[0i64, 1, 0, 0, 1, 0, 1, 0, 0, 1]
    )
    .unwrap()
    .into()
}

/// Writes `df` as CSV into `dir` under `name`.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// A temporary directory holding the ten-row store as `retail.csv`.
pub fn ten_row_store_csv() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut df = ten_row_store().into_frame();
    let path = write_csv(dir.path(), "retail.csv", &mut df);
    (dir, path)
}
