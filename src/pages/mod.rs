//! Page computations. Each page takes the session's dataset plus its parameters
//! and returns a serializable report; optional sections whose columns are absent
//! are left as `None` and noted in the report's warnings.

pub mod category;
pub mod dashboard;
pub mod deep_visuals;
pub mod explorer;
pub mod overview;

pub use category::{category_analysis, CategoryMetrics, CategoryReport};
pub use dashboard::{dashboard, DashboardMetrics, DashboardReport};
pub use deep_visuals::{deep_visuals, BubblePoint, DeepVisualsReport, HierarchyNode};
pub use explorer::{explorer, ExplorerReport, ExplorerSummary, ScatterPoint, Threshold};
pub use overview::{overview, ColumnInfo, OverviewReport};

use crate::cli::{Args, Page};
use crate::config::AnalysisConfig;
use crate::dataset::Dataset;
use crate::error::{InsightError, Result};
use crate::filter::{FilterSpec, Selection};
use crate::session::Session;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageReport {
    Overview(OverviewReport),
    Dashboard(DashboardReport),
    Category(CategoryReport),
    Explorer(ExplorerReport),
    DeepVisuals(DeepVisualsReport),
}

impl PageReport {
    pub fn warnings(&self) -> &[String] {
        match self {
            PageReport::Overview(_) => &[],
            PageReport::Dashboard(r) => &r.warnings,
            PageReport::Category(r) => &r.warnings,
            PageReport::Explorer(r) => &r.warnings,
            PageReport::DeepVisuals(r) => &r.warnings,
        }
    }
}

/// Everything a page needs besides the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: Page,
    pub regions: Selection,
    pub categories: Selection,
    pub select_category: Option<String>,
    pub explorer_filters: Vec<FilterSpec>,
    pub analysis: AnalysisConfig,
}

impl PageRequest {
    pub fn new(page: Page, analysis: AnalysisConfig) -> Self {
        Self {
            page,
            regions: Selection::All,
            categories: Selection::All,
            select_category: None,
            explorer_filters: Vec::new(),
            analysis,
        }
    }

    /// Builds the request from command-line flags on top of the `[analysis]` config.
    pub fn from_args(args: &Args, analysis: &AnalysisConfig) -> Result<Self> {
        let mut analysis = analysis.clone();
        if let Some(n) = args.top_n {
            if n == 0 {
                return Err(InsightError::InvalidFilter("--top 0".to_string()));
            }
            analysis.top_n = n;
        }

        let mut explorer_filters = Vec::with_capacity(args.filters.len() + args.ranges.len());
        for raw in &args.filters {
            explorer_filters.push(FilterSpec::parse_categorical(raw)?);
        }
        for raw in &args.ranges {
            explorer_filters.push(FilterSpec::parse_range(raw)?);
        }

        Ok(Self {
            page: args.page,
            regions: selection(&args.regions),
            categories: selection(&args.categories),
            select_category: args.select_category.clone(),
            explorer_filters,
            analysis,
        })
    }
}

/// An empty list of values means "no explicit selection".
pub fn selection(values: &[String]) -> Selection {
    if values.is_empty() {
        Selection::All
    } else {
        Selection::Only(values.iter().cloned().collect::<BTreeSet<_>>())
    }
}

/// Runs the requested page against the session's dataset.
pub fn run(session: &Session, request: &PageRequest) -> Result<PageReport> {
    let dataset = session.dataset()?;
    let started = std::time::Instant::now();
    let report = match request.page {
        Page::Overview => PageReport::Overview(overview(dataset, session.source())?),
        Page::Dashboard => PageReport::Dashboard(dashboard(
            dataset,
            &request.regions,
            &request.categories,
            request.analysis.row_limit,
        )?),
        Page::Category => PageReport::Category(category_analysis(
            dataset,
            request.select_category.as_deref(),
            request.analysis.row_limit,
        )?),
        Page::Explorer => PageReport::Explorer(explorer(
            dataset,
            &request.explorer_filters,
            &request.analysis,
        )?),
        Page::DeepVisuals => PageReport::DeepVisuals(deep_visuals(dataset)?),
    };
    log::debug!("Page {:?} computed in {:?}", request.page, started.elapsed());
    Ok(report)
}

/// Rows of a dataset rendered as strings, for tabular sections of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowTable {
    pub columns: Vec<String>,
    /// `None` cells are nulls.
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows in the source before the limit was applied.
    pub total_rows: usize,
}

impl RowTable {
    pub fn from_dataset(dataset: &Dataset, limit: usize) -> Result<Self> {
        let shown = dataset.head(limit);
        let columns = shown.column_names();
        let values = columns
            .iter()
            .map(|c| shown.text_values(c))
            .collect::<Result<Vec<_>>>()?;
        let rows = (0..shown.height())
            .map(|i| values.iter().map(|col| col[i].clone()).collect())
            .collect();
        Ok(Self {
            columns,
            rows,
            total_rows: dataset.height(),
        })
    }

    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

/// Turns a schema gap into `None` plus a warning; other errors propagate.
pub(crate) fn optional<T>(
    result: Result<T>,
    feature: &str,
    warnings: &mut Vec<String>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_schema_gap() => {
            log::warn!("{} unavailable: {}", feature, e);
            warnings.push(format!("{} unavailable: {}", feature, e));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Display form of a mean: truncated toward zero.
pub(crate) fn truncate_mean(mean: Option<f64>) -> Option<i64> {
    mean.map(|m| m.trunc() as i64)
}
