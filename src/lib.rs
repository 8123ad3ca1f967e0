//! stockscope: retail inventory and sales exploration over CSV and Excel files.
//!
//! The core is a filter engine ([`filter`]) and an aggregation engine
//! ([`aggregate`], [`statistics`]) over a polars-backed [`Dataset`]. The
//! [`pages`] module composes them into the dashboard, category, explorer and
//! deep-visual reports; [`render`] turns a report into text or JSON.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod error_display;
pub mod filter;
pub mod loader;
pub mod pages;
pub mod render;
pub mod session;
pub mod statistics;

pub use cli::{Args, FileFormat, OutputFormat, Page};
pub use config::{AppConfig, ConfigManager};
pub use dataset::Dataset;
pub use error::{InsightError, Result};
pub use filter::{apply_filters, FilterSpec, Selection};
pub use loader::{load_dataset, open_session, OpenOptions};
pub use pages::{PageReport, PageRequest};
pub use session::Session;

/// Application name used for the config directory
pub const APP_NAME: &str = "stockscope";
