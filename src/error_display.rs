//! User-facing error message formatting.
//!
//! Matches on typed errors (InsightError, PolarsError variants, io::ErrorKind)
//! rather than parsing strings.

use crate::error::InsightError;
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Format an engine error as a user-facing message.
pub fn user_message_from_insight(err: &InsightError) -> String {
    match err {
        InsightError::NoDataLoaded => "No data loaded. Load a CSV or Excel file first.".to_string(),
        InsightError::ColumnNotFound(name) => format!(
            "Column not found: {}. Check spelling and that the file has this column.",
            name
        ),
        InsightError::NotNumeric { column, dtype } => format!(
            "Column '{}' holds {} values; a numeric column is required.",
            column, dtype
        ),
        InsightError::InvalidPercentileRange { column, low, high } => format!(
            "Invalid range {}:{} for '{}'. Use LOW:HIGH with 0 <= LOW <= HIGH <= 100.",
            low, high, column
        ),
        InsightError::InvalidFilter(raw) => format!(
            "Invalid filter '{}'. Use COL=VALUE[,VALUE...] or COL=LOW:HIGH.",
            raw
        ),
        InsightError::Polars(pe) => user_message_from_polars(pe),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => format!("Could not read the data: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find InsightError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(ie) = cause.downcast_ref::<InsightError>() {
            // Analysis errors happen after the load succeeded.
            return user_message_from_insight(ie);
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: first line of the display, without the traceback
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::{eyre, Report, WrapErr};

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("foo"), "expected 'foo', got: {}", msg);
        assert!(msg.contains("Column not found"), "got: {}", msg);
    }

    #[test]
    fn test_no_data_loaded_asks_for_file() {
        let report = Report::new(InsightError::NoDataLoaded);
        let msg = user_message_from_report(&report, None);
        assert!(msg.contains("Load a CSV or Excel file first"), "got: {}", msg);
    }

    #[test]
    fn test_report_chain_finds_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let report = Err::<(), _>(io_err)
            .wrap_err("reading retail.csv")
            .unwrap_err();
        let msg = user_message_from_report(&report, Some(Path::new("retail.csv")));
        assert!(msg.starts_with("Failed to load retail.csv"), "got: {}", msg);
        assert!(msg.contains("not found"), "got: {}", msg);
    }

    #[test]
    fn test_fallback_uses_first_line() {
        let report = eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report, None), "first line");
    }
}
