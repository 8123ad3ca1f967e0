//! Session-scoped dataset store.
//!
//! A `Session` is an explicit value owned by the caller and passed to each page,
//! so sessions never share data and pages can be tested without ambient state.

use crate::dataset::Dataset;
use crate::error::{InsightError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Dataset>,
    source: Option<PathBuf>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly loaded dataset, replacing any previous one.
    pub fn load(&mut self, dataset: Dataset, source: Option<&Path>) {
        log::debug!(
            "Session loaded {} rows x {} columns",
            dataset.height(),
            dataset.column_names().len()
        );
        self.dataset = Some(dataset);
        self.source = source.map(Path::to_path_buf);
    }

    /// The loaded dataset, or `NoDataLoaded` before the first load.
    pub fn dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or(InsightError::NoDataLoaded)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.source = None;
    }
}
