use crate::cli::OutputFormat;
use crate::dataset::columns;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to config.toml; refuses to overwrite unless `force`
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub infer_schema_length: Option<usize>,
    pub excel_sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_n: usize,
    pub row_limit: usize,
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            row_limit: 500,
            categorical_columns: columns::CATEGORICAL_FILTER_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            numeric_columns: columns::NUMERIC_FILTER_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_from(&ConfigManager::new(app_name)?)
    }

    /// Load configuration using the config.toml managed by `manager`
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(manager)?);
        config.validate()?;
        Ok(config)
    }

    fn load_user_config(manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = manager.config_path("config.toml");

        if !config_path.exists() {
            log::debug!("No config file at {}", config_path.display());
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.analysis.merge(other.analysis);
        self.output.merge(other.output);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.analysis.top_n == 0 {
            return Err(eyre!("top_n must be greater than 0"));
        }

        if self.analysis.row_limit == 0 {
            return Err(eyre!("row_limit must be greater than 0"));
        }

        self.output.output_format()?;

        Ok(())
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
        if other.excel_sheet.is_some() {
            self.excel_sheet = other.excel_sheet;
        }
    }
}

impl AnalysisConfig {
    pub fn merge(&mut self, other: Self) {
        let default = AnalysisConfig::default();
        if other.top_n != default.top_n {
            self.top_n = other.top_n;
        }
        if other.row_limit != default.row_limit {
            self.row_limit = other.row_limit;
        }
        if other.categorical_columns != default.categorical_columns {
            self.categorical_columns = other.categorical_columns;
        }
        if other.numeric_columns != default.numeric_columns {
            self.numeric_columns = other.numeric_columns;
        }
    }
}

impl OutputConfig {
    pub fn merge(&mut self, other: Self) {
        if other.format != OutputConfig::default().format {
            self.format = other.format;
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(eyre!(
                "Invalid output format: {}. Must be 'text' or 'json'",
                other
            )),
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled != DebugConfig::default().enabled {
            self.enabled = other.enabled;
        }
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut config = AppConfig::default();
        let other: AppConfig = toml::from_str("[analysis]\ntop_n = 3\n").unwrap();
        config.merge(other);
        assert_eq!(config.analysis.top_n, 3);
        assert_eq!(config.analysis.row_limit, 500);
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn output_format_is_case_insensitive() {
        let output = OutputConfig {
            format: "JSON".to_string(),
        };
        assert_eq!(output.output_format().unwrap(), OutputFormat::Json);
    }
}
