use polars::prelude::*;
use std::fs;
use stockscope::dataset::columns::*;
use stockscope::{load_dataset, FileFormat, OpenOptions};
use tempfile::TempDir;

mod common;

#[test]
fn test_load_csv_parses_dates() {
    let (_dir, path) = common::ten_row_store_csv();
    let ds = load_dataset(&path, &OpenOptions::default()).unwrap();
    assert_eq!(ds.height(), 10);
    assert_eq!(ds.dtype(DATE).unwrap(), DataType::Date);
    assert!(ds.is_numeric(UNITS_SOLD));
    assert_eq!(
        ds.distinct_values(DATE).unwrap().first().map(String::as_str),
        Some("2022-01-01")
    );
}

#[test]
fn test_load_trims_header_whitespace() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("padded.csv");
    fs::write(&path, " Region , Units Sold\nNorth,10\nSouth,20\n").unwrap();
    let ds = load_dataset(&path, &OpenOptions::default()).unwrap();
    assert_eq!(ds.column_names(), vec![REGION, UNITS_SOLD]);
}

#[test]
fn test_load_tsv_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("retail.tsv");
    fs::write(&path, "Region\tUnits Sold\nNorth\t10\n").unwrap();
    let ds = load_dataset(&path, &OpenOptions::default()).unwrap();
    assert_eq!(ds.numeric_values(UNITS_SOLD).unwrap(), vec![Some(10.0)]);
}

#[test]
fn test_explicit_format_and_delimiter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("retail.data");
    fs::write(&path, "Region;Units Sold\nNorth;10\nEast;5\n").unwrap();

    assert!(load_dataset(&path, &OpenOptions::default()).is_err());

    let opts = OpenOptions::new()
        .with_format(FileFormat::Csv)
        .with_delimiter(b';');
    let ds = load_dataset(&path, &opts).unwrap();
    assert_eq!(ds.height(), 2);
    assert_eq!(ds.distinct_values(REGION).unwrap(), vec!["East", "North"]);
}

#[test]
fn test_unparseable_date_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad_dates.csv");
    fs::write(&path, "Date,Units Sold\n2022-01-01,1\nsometime,2\n").unwrap();
    assert!(load_dataset(&path, &OpenOptions::default()).is_err());
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");
    assert!(load_dataset(&path, &OpenOptions::default()).is_err());
}
