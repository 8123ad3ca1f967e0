//! Reads a delimited text file or an Excel workbook into a [`Dataset`].
//!
//! CSV goes through polars' reader; Excel goes through calamine with per-column
//! type inference. In both cases a `Date` column is normalized to a calendar date.

use crate::cli::{Args, FileFormat};
use crate::config::FileLoadingConfig;
use crate::dataset::columns::DATE;
use crate::dataset::Dataset;
use crate::session::Session;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use std::path::Path;

/// Default number of rows used to infer a CSV schema.
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub format: Option<FileFormat>,
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub infer_schema_length: Option<usize>,
    pub excel_sheet: Option<String>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    pub fn with_excel_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.excel_sheet = Some(sheet.into());
        self
    }

    /// Config file values first, then command-line flags on top.
    pub fn from_args(args: &Args, config: &FileLoadingConfig) -> Self {
        let mut opts = OpenOptions {
            format: None,
            delimiter: config.delimiter,
            has_header: config.has_header,
            infer_schema_length: config.infer_schema_length,
            excel_sheet: config.excel_sheet.clone(),
        };
        if let Some(format) = args.format {
            opts = opts.with_format(format);
        }
        if let Some(delimiter) = args.delimiter {
            let mut buf = [0u8; 4];
            let encoded = delimiter.encode_utf8(&mut buf);
            if encoded.len() == 1 {
                opts = opts.with_delimiter(encoded.as_bytes()[0]);
            } else {
                log::warn!("Ignoring non-ASCII delimiter '{}'", delimiter);
            }
        }
        if let Some(no_header) = args.no_header {
            opts = opts.with_has_header(!no_header);
        }
        if let Some(n) = args.infer_schema_length {
            opts = opts.with_infer_schema_length(n);
        }
        if let Some(sheet) = &args.excel_sheet {
            opts = opts.with_excel_sheet(sheet.clone());
        }
        opts
    }
}

/// Builds the session for one invocation. Without a path the session stays
/// empty, so pages report that no data is loaded.
pub fn open_session(args: &Args, config: &FileLoadingConfig) -> Result<Session> {
    let mut session = Session::new();
    if let Some(path) = args.path.as_deref() {
        let opts = OpenOptions::from_args(args, config);
        let started = std::time::Instant::now();
        let dataset = load_dataset(path, &opts)?;
        log::debug!("Loaded {} in {:?}", path.display(), started.elapsed());
        session.load(dataset, Some(path));
    }
    Ok(session)
}

/// Loads `path` using the explicit format, or the one implied by its extension.
pub fn load_dataset(path: &Path, options: &OpenOptions) -> Result<Dataset> {
    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| {
            eyre!(
                "Cannot detect the format of {}. Use --format csv, tsv or excel.",
                path.display()
            )
        })?;

    let df = match format {
        FileFormat::Csv | FileFormat::Tsv => {
            let delimiter = options
                .delimiter
                .or_else(|| format.default_delimiter())
                .unwrap_or(b',');
            read_delimited(path, options, delimiter)?
        }
        FileFormat::Excel => read_excel(path, options.excel_sheet.as_deref())?,
    };

    let df = normalize_date_column(df)
        .wrap_err_with(|| format!("Failed to parse the {} column of {}", DATE, path.display()))?;
    log::debug!(
        "Loaded {} ({:?}): {} rows, columns {:?}",
        path.display(),
        format,
        df.height(),
        df.get_column_names()
    );
    Ok(Dataset::new(df))
}

fn read_delimited(path: &Path, options: &OpenOptions, delimiter: u8) -> Result<DataFrame> {
    let mut read_options = CsvReadOptions::default();
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    read_options.infer_schema_length = Some(
        options
            .infer_schema_length
            .unwrap_or(DEFAULT_INFER_SCHEMA_LENGTH),
    );
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(delimiter).with_try_parse_dates(true)
    });
    let df = read_options
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    trim_column_names(df)
}

/// Strips stray whitespace from header cells (e.g. `" Units Sold"`).
fn trim_column_names(df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let trimmed: Vec<String> = names.iter().map(|s| s.trim().to_string()).collect();
    if names == trimmed {
        return Ok(df);
    }
    Ok(df
        .lazy()
        .rename(
            names.iter().map(|s| s.as_str()),
            trimmed.iter().map(|s| s.as_str()),
            false,
        )
        .collect()?)
}

/// Converts a string or datetime `Date` column to a polars `Date`.
/// Unparseable strings fail the load; other column types are rejected.
fn normalize_date_column(df: DataFrame) -> Result<DataFrame> {
    let dtype = match df.column(DATE) {
        Ok(c) => c.dtype().clone(),
        Err(_) => return Ok(df),
    };
    let expr = match dtype {
        DataType::Date => return Ok(df),
        DataType::Datetime(_, _) => col(DATE).cast(DataType::Date),
        DataType::String => col(DATE).str().to_date(StrptimeOptions::default()),
        other => {
            return Err(eyre!(
                "column '{}' has type {} and cannot be read as a calendar date",
                DATE,
                other
            ))
        }
    };
    Ok(df.lazy().with_column(expr.alias(DATE)).collect()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
    Date,
    Datetime,
}

/// Reads one worksheet (by 0-based index or name; first sheet by default).
/// The first row is the header.
fn read_excel(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }
    let range = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| eyre!("Excel: no sheet at index {}", idx))?
                .map_err(|e| eyre!("Excel: {}", e))?,
            Err(_) => workbook
                .worksheet_range(sel)
                .map_err(|e| eyre!("Excel: {}", e))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| eyre!("Excel: no first sheet"))?
            .map_err(|e| eyre!("Excel: {}", e))?,
    };

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };

    let mut columns: Vec<Column> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let name = calamine::DataType::as_string(cell)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("column_{}", idx + 1));
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(idx)).collect();
        let series = excel_column_to_series(&name, &cells, infer_excel_column_type(&cells))?;
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Whole-number floats become Int64; strings that all parse as ISO dates become dates.
fn infer_excel_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    use calamine::DataType as CellType;
    let present = || {
        cells
            .iter()
            .flatten()
            .copied()
            .filter(|c| !CellType::is_empty(*c))
    };
    if present().next().is_none() {
        return ExcelColType::Utf8;
    }
    if present().any(|c| CellType::is_string(c)) {
        let all_dates = present().all(|c| cell_to_naive_datetime(c).is_some());
        return if all_dates {
            date_or_datetime(cells)
        } else {
            ExcelColType::Utf8
        };
    }
    if present().any(|c| CellType::is_datetime(c) || CellType::is_datetime_iso(c)) {
        return date_or_datetime(cells);
    }
    if present().all(|c| CellType::is_bool(c)) {
        return ExcelColType::Boolean;
    }
    let all_whole = present().all(|c| {
        c.as_f64()
            .is_some_and(|f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
    });
    if all_whole {
        ExcelColType::Int64
    } else {
        ExcelColType::Float64
    }
}

fn date_or_datetime(cells: &[Option<&Data>]) -> ExcelColType {
    let midnight = NaiveTime::MIN;
    let all_midnight = cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_naive_datetime(c))
        .all(|dt| dt.time() == midnight);
    if all_midnight {
        ExcelColType::Date
    } else {
        ExcelColType::Datetime
    }
}

fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime(s)
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn excel_column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: ExcelColType,
) -> Result<Series> {
    use calamine::DataType as CellType;
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| cell.as_f64()).map(|f| f as i64))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_f64())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|cell| cell.get_bool())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.filter(|cell| !CellType::is_empty(*cell)).and_then(|cell| cell.as_string()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let epoch = NaiveDate::default();
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| (dt.date() - epoch).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_naive_datetime)
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_override_config_file_options() {
        use clap::Parser;
        let config = FileLoadingConfig {
            delimiter: Some(b';'),
            has_header: Some(true),
            infer_schema_length: Some(50),
            excel_sheet: Some("Sales".to_string()),
        };
        let args = Args::try_parse_from([
            "stockscope",
            "retail.csv",
            "--delimiter",
            "|",
            "--no-header",
            "true",
        ])
        .unwrap();
        let opts = OpenOptions::from_args(&args, &config);
        assert_eq!(opts.delimiter, Some(b'|'));
        assert_eq!(opts.has_header, Some(false));
        assert_eq!(opts.infer_schema_length, Some(50));
        assert_eq!(opts.excel_sheet.as_deref(), Some("Sales"));
        assert_eq!(opts.format, None);
    }

    #[test]
    fn parse_naive_datetime_formats() {
        assert_eq!(
            parse_naive_datetime("2022-01-01"),
            NaiveDate::from_ymd_opt(2022, 1, 1).map(|d| d.and_time(NaiveTime::MIN))
        );
        assert!(parse_naive_datetime("2022-01-01 10:30:00").is_some());
        assert!(parse_naive_datetime("not a date").is_none());
    }

    #[test]
    fn excel_inference_prefers_int_for_whole_floats() {
        let cells = [Data::Float(1.0), Data::Float(2.0), Data::Empty];
        let refs: Vec<Option<&Data>> = cells.iter().map(Some).collect();
        assert_eq!(infer_excel_column_type(&refs), ExcelColType::Int64);

        let cells = [Data::Float(1.5), Data::Int(2)];
        let refs: Vec<Option<&Data>> = cells.iter().map(Some).collect();
        assert_eq!(infer_excel_column_type(&refs), ExcelColType::Float64);
    }

    #[test]
    fn excel_inference_text_and_dates() {
        let cells = [
            Data::String("2022-01-01".into()),
            Data::String("2022-01-02".into()),
        ];
        let refs: Vec<Option<&Data>> = cells.iter().map(Some).collect();
        assert_eq!(infer_excel_column_type(&refs), ExcelColType::Date);

        let cells = [Data::String("North".into()), Data::Float(1.0)];
        let refs: Vec<Option<&Data>> = cells.iter().map(Some).collect();
        assert_eq!(infer_excel_column_type(&refs), ExcelColType::Utf8);
    }

    #[test]
    fn string_date_column_normalized() {
        let df = df!(DATE => &["2022-01-02", "2022-01-01"], "x" => &[1i64, 2]).unwrap();
        let out = normalize_date_column(df).unwrap();
        assert_eq!(out.column(DATE).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn unparseable_date_column_fails() {
        let df = df!(DATE => &["yesterday"]).unwrap();
        assert!(normalize_date_column(df).is_err());
    }

    #[test]
    fn numeric_date_column_rejected() {
        let df = df!(DATE => &[20220101i64]).unwrap();
        assert!(normalize_date_column(df).is_err());
    }
}
