//! Shared CLI definitions for stockscope.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// File format for input files (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Excel (.xls, .xlsx, .xlsm, .xlsb)
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Field delimiter implied by the format, if it is a delimited text format.
    pub fn default_delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Excel => None,
        }
    }
}

/// Analysis page to run against the loaded dataset
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum Page {
    /// Load confirmation: shape, schema and the first rows
    #[default]
    Overview,
    /// Sales and inventory dashboard filtered by region and category
    Dashboard,
    /// Drill-down into a single category
    Category,
    /// Multi-condition explorer with categorical and percentile-range filters
    Explorer,
    /// Correlations, hierarchies and distributions
    DeepVisuals,
}

/// How page reports are written to stdout
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text report
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Command-line arguments for stockscope
#[derive(Clone, Parser, Debug)]
#[command(
    name = "stockscope",
    version,
    about = "Retail inventory and sales exploration",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Path to the CSV/TSV or Excel file to load. Without it pages report that no data is loaded
    #[arg(value_name = "PATH")]
    pub path: Option<std::path::PathBuf>,

    /// Page to compute
    #[arg(long = "page", value_enum, default_value_t = Page::Overview)]
    pub page: Page,

    /// Dashboard: keep only this region (repeatable). Default: all regions
    #[arg(long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Dashboard: keep only this category (repeatable). Default: all categories
    #[arg(long = "category", value_name = "CATEGORY")]
    pub categories: Vec<String>,

    /// Category page: category to analyse. Default: first category in sorted order
    #[arg(long = "select-category", value_name = "CATEGORY")]
    pub select_category: Option<String>,

    /// Explorer: categorical filter as COL=VALUE[,VALUE...] (repeatable)
    #[arg(long = "filter", value_name = "COL=VALUES")]
    pub filters: Vec<String>,

    /// Explorer: percentile range filter as COL=LOW:HIGH with 0 <= LOW <= HIGH <= 100 (repeatable)
    #[arg(long = "range", value_name = "COL=LOW:HIGH")]
    pub ranges: Vec<String>,

    /// Number of entries in top-N rankings (overrides config [analysis] top_n)
    #[arg(long = "top", value_name = "N")]
    pub top_n: Option<usize>,

    /// Report format (overrides config [output] format)
    #[arg(long = "output", value_enum)]
    pub output: Option<OutputFormat>,

    /// Force file format (csv, tsv, excel). By default format is auto-detected from the file extension
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<char>,

    /// Specify that the file has no header
    #[arg(long = "no-header")]
    pub no_header: Option<bool>,

    /// Number of rows to use when inferring CSV schema (default: 1000)
    #[arg(long = "infer-schema-length", value_name = "N")]
    pub infer_schema_length: Option<usize>,

    /// Excel sheet to load: 0-based index (e.g. 0) or sheet name (e.g. "Sales")
    #[arg(long = "sheet", value_name = "SHEET")]
    pub excel_sheet: Option<String>,

    /// Enable debug logging (load and page timings, skipped features)
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/stockscope/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("retail.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("retail.TSV")),
            Some(FileFormat::Tsv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("retail_store_inventory.xlsx")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        assert_eq!(FileFormat::from_path(Path::new("data.parquet")), None);
    }

    #[test]
    fn test_default_delimiter() {
        assert_eq!(FileFormat::Csv.default_delimiter(), Some(b','));
        assert_eq!(FileFormat::Tsv.default_delimiter(), Some(b'\t'));
        assert_eq!(FileFormat::Excel.default_delimiter(), None);
    }

    #[test]
    fn test_args_parse_explorer_filters() {
        let args = Args::try_parse_from([
            "stockscope",
            "retail.csv",
            "--page",
            "explorer",
            "--filter",
            "Region=North,South",
            "--range",
            "Price=10:90",
        ])
        .unwrap();
        assert_eq!(args.page, Page::Explorer);
        assert_eq!(args.filters, vec!["Region=North,South".to_string()]);
        assert_eq!(args.ranges, vec!["Price=10:90".to_string()]);
    }

    #[test]
    fn test_path_is_optional() {
        let args = Args::try_parse_from(["stockscope", "--page", "dashboard"]).unwrap();
        assert!(args.path.is_none());
        assert_eq!(args.page, Page::Dashboard);
        let args = Args::try_parse_from(["stockscope", "--generate-config"]).unwrap();
        assert!(args.generate_config);
        assert!(args.path.is_none());
    }

    #[test]
    fn test_options_markdown_lists_page() {
        let md = render_options_markdown();
        assert!(md.contains("--page"));
        assert!(md.contains("--range"));
    }
}
