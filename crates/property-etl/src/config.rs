//! Configuration types for the ETL pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! A configuration can also be deserialized from a JSON file and then
//! overridden field by field from the command line.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Rounding rule applied to the fixed set of rounded decimal columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties go to the even neighbour (`0.125 -> 0.12`, `0.375 -> 0.38`)
    #[default]
    HalfToEven,
    /// Ties go away from zero (`0.125 -> 0.13`, `-0.125 -> -0.13`)
    HalfAwayFromZero,
}

/// What the loader does once a table stage has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip every later stage
    #[default]
    Halt,
    /// Keep loading later stages with whatever keys were resolved
    Continue,
}

/// What the loader does with a row whose foreign key cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedKeyPolicy {
    /// Leave the row out of the insert and count it
    #[default]
    Skip,
    /// Insert the row with a NULL foreign key and count it
    InsertNull,
    /// Fail the table stage
    Abort,
}

/// Connection settings for the target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file (`:memory:` for an in-memory database).
    pub path: PathBuf,

    /// Whether to create the seven target tables when they do not exist.
    /// Default: false
    #[serde(default)]
    pub create_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("home.db"),
            create_schema: false,
        }
    }
}

/// Settings for the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Decimal places kept in `Tax_Rate`, `Net_Yield`, `IRR` and `School_Average`.
    /// Default: 2
    pub rounding_decimals: u32,

    /// Tie-breaking rule for rounding.
    /// Default: HalfToEven
    pub rounding_mode: RoundingMode,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            rounding_decimals: 2,
            rounding_mode: RoundingMode::default(),
        }
    }
}

/// Settings for the load stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Behavior after a failed table stage.
    /// Default: Halt
    pub failure_policy: FailurePolicy,

    /// Behavior for rows whose foreign key is unknown.
    /// Default: Skip
    pub unresolved_keys: UnresolvedKeyPolicy,

    /// Run the whole multi-table load in one transaction.
    /// When false every address/property insert commits on its own.
    /// Default: true
    pub atomic: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            unresolved_keys: UnresolvedKeyPolicy::default(),
            atomic: true,
        }
    }
}

/// Configuration for the ETL pipeline.
///
/// Use [`EtlConfig::builder()`] to create a new configuration with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use property_etl::config::{EtlConfig, FailurePolicy};
///
/// let config = EtlConfig::builder()
///     .input_path("sql/fake_data.csv")
///     .database_path("home.db")
///     .failure_policy(FailurePolicy::Halt)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// CSV file to extract.
    pub input_path: PathBuf,

    /// Target database.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Transform stage settings.
    #[serde(default)]
    pub transform: TransformConfig,

    /// Load stage settings.
    #[serde(default)]
    pub load: LoadConfig,

    /// Where to write the cleaned unified table as CSV, if anywhere.
    #[serde(default)]
    pub export_cleaned: Option<PathBuf>,

    /// Where to write the JSON run report, if anywhere.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("sql/fake_data.csv"),
            database: DatabaseConfig::default(),
            transform: TransformConfig::default(),
            load: LoadConfig::default(),
            export_cleaned: None,
            report_path: None,
        }
    }
}

impl EtlConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EtlConfigBuilder {
        EtlConfigBuilder::default()
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: EtlConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| EtlError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.transform.rounding_decimals > MAX_ROUNDING_DECIMALS {
            return Err(ConfigValidationError::InvalidRoundingDecimals(
                self.transform.rounding_decimals,
            ));
        }

        if self.input_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("input_path".to_string()));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath("database.path".to_string()));
        }

        if let Some(export) = &self.export_cleaned
            && export == &self.input_path
        {
            return Err(ConfigValidationError::ExportOverwritesInput(
                export.display().to_string(),
            ));
        }

        Ok(())
    }
}

/// Largest supported `rounding_decimals`; beyond this the scale factor loses precision.
pub const MAX_ROUNDING_DECIMALS: u32 = 10;

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid rounding decimals: {0} (must be at most 10)")]
    InvalidRoundingDecimals(u32),

    #[error("Path '{0}' must not be empty")]
    EmptyPath(String),

    #[error("Cleaned export '{0}' would overwrite the input file")]
    ExportOverwritesInput(String),
}

impl From<ConfigValidationError> for EtlError {
    fn from(err: ConfigValidationError) -> Self {
        EtlError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EtlConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EtlConfigBuilder {
    base: Option<EtlConfig>,
    input_path: Option<PathBuf>,
    database_path: Option<PathBuf>,
    create_schema: Option<bool>,
    rounding_decimals: Option<u32>,
    rounding_mode: Option<RoundingMode>,
    failure_policy: Option<FailurePolicy>,
    unresolved_keys: Option<UnresolvedKeyPolicy>,
    atomic: Option<bool>,
    export_cleaned: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl EtlConfigBuilder {
    /// Start from an existing configuration (e.g. one read from JSON) instead of the defaults.
    pub fn from_config(mut self, config: EtlConfig) -> Self {
        self.base = Some(config);
        self
    }

    /// Set the CSV file to extract.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    /// Set the SQLite database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Create missing target tables before loading.
    pub fn create_schema(mut self, enabled: bool) -> Self {
        self.create_schema = Some(enabled);
        self
    }

    /// Set the number of decimals kept by the rounding step.
    pub fn rounding_decimals(mut self, decimals: u32) -> Self {
        self.rounding_decimals = Some(decimals);
        self
    }

    /// Set the tie-breaking rule for rounding.
    pub fn rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = Some(mode);
        self
    }

    /// Set the behavior after a failed table stage.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Set the behavior for unresolvable foreign keys.
    pub fn unresolved_keys(mut self, policy: UnresolvedKeyPolicy) -> Self {
        self.unresolved_keys = Some(policy);
        self
    }

    /// Wrap the load in a single transaction.
    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = Some(atomic);
        self
    }

    /// Write the cleaned unified table to this CSV path.
    pub fn export_cleaned(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_cleaned = Some(path.into());
        self
    }

    /// Write the JSON run report to this path.
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] if any setting is out of range.
    pub fn build(self) -> std::result::Result<EtlConfig, ConfigValidationError> {
        let mut config = self.base.unwrap_or_default();

        if let Some(path) = self.input_path {
            config.input_path = path;
        }
        if let Some(path) = self.database_path {
            config.database.path = path;
        }
        if let Some(enabled) = self.create_schema {
            config.database.create_schema = enabled;
        }
        if let Some(decimals) = self.rounding_decimals {
            config.transform.rounding_decimals = decimals;
        }
        if let Some(mode) = self.rounding_mode {
            config.transform.rounding_mode = mode;
        }
        if let Some(policy) = self.failure_policy {
            config.load.failure_policy = policy;
        }
        if let Some(policy) = self.unresolved_keys {
            config.load.unresolved_keys = policy;
        }
        if let Some(atomic) = self.atomic {
            config.load.atomic = atomic;
        }
        if self.export_cleaned.is_some() {
            config.export_cleaned = self.export_cleaned;
        }
        if self.report_path.is_some() {
            config.report_path = self.report_path;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.transform.rounding_decimals, 2);
        assert_eq!(config.transform.rounding_mode, RoundingMode::HalfToEven);
        assert_eq!(config.load.failure_policy, FailurePolicy::Halt);
        assert_eq!(config.load.unresolved_keys, UnresolvedKeyPolicy::Skip);
        assert!(config.load.atomic);
        assert!(!config.database.create_schema);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EtlConfig::builder()
            .input_path("data.csv")
            .database_path(":memory:")
            .rounding_mode(RoundingMode::HalfAwayFromZero)
            .failure_policy(FailurePolicy::Continue)
            .unresolved_keys(UnresolvedKeyPolicy::InsertNull)
            .atomic(false)
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("data.csv"));
        assert_eq!(config.database.path, PathBuf::from(":memory:"));
        assert_eq!(config.transform.rounding_mode, RoundingMode::HalfAwayFromZero);
        assert_eq!(config.load.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.load.unresolved_keys, UnresolvedKeyPolicy::InsertNull);
        assert!(!config.load.atomic);
    }

    #[test]
    fn test_builder_keeps_base_config() {
        let mut base = EtlConfig::default();
        base.load.atomic = false;
        base.report_path = Some(PathBuf::from("run.json"));

        let config = EtlConfig::builder()
            .from_config(base)
            .input_path("other.csv")
            .build()
            .unwrap();

        assert!(!config.load.atomic);
        assert_eq!(config.report_path, Some(PathBuf::from("run.json")));
        assert_eq!(config.input_path, PathBuf::from("other.csv"));
    }

    #[test]
    fn test_invalid_rounding_decimals() {
        let result = EtlConfig::builder().rounding_decimals(11).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidRoundingDecimals(11))
        ));
    }

    #[test]
    fn test_export_must_not_overwrite_input() {
        let result = EtlConfig::builder()
            .input_path("data.csv")
            .export_cleaned("data.csv")
            .build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::ExportOverwritesInput(_))
        ));
    }

    #[test]
    fn test_config_from_json_uses_defaults_for_missing_sections() {
        let json = r#"{ "input_path": "in.csv", "load": { "failure_policy": "continue", "unresolved_keys": "insert_null", "atomic": false } }"#;
        let config: EtlConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.input_path, PathBuf::from("in.csv"));
        assert_eq!(config.load.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.load.unresolved_keys, UnresolvedKeyPolicy::InsertNull);
        assert_eq!(config.transform, TransformConfig::default());
        assert_eq!(config.database.path, PathBuf::from("home.db"));
    }
}
