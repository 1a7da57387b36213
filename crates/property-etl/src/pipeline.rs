//! End-to-end ETL pipeline.
//!
//! This module provides the `EtlPipeline` struct and its builder, which run
//! extract, schema validation, transform, split and load in that order.

use crate::cleaner::Transformer;
use crate::config::EtlConfig;
use crate::error::{EtlError, Result, ResultExt};
use crate::extract::load_csv;
use crate::loader::load;
use crate::report::RunReport;
use crate::schema::{create_tables, validate_columns};
use crate::split::TableSplitter;
use polars::prelude::*;
use rusqlite::Connection;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// The property ETL pipeline.
///
/// Use [`EtlPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use property_etl::{EtlConfig, EtlPipeline};
/// use rusqlite::Connection;
///
/// let config = EtlConfig::builder().input_path("sql/fake_data.csv").build()?;
/// let mut conn = Connection::open(&config.database.path)?;
///
/// let report = EtlPipeline::builder()
///     .config(config)
///     .build()?
///     .run(&mut conn)?;
/// assert!(report.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    config: EtlConfig,
    transformer: Transformer,
}

static_assertions::assert_impl_all!(EtlPipeline: Send);

impl EtlPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> EtlPipelineBuilder {
        EtlPipelineBuilder::default()
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Run the whole pipeline against `conn`.
    ///
    /// Extraction, validation and transform errors are returned as `Err`.
    /// Load failures are captured per table in the report instead.
    pub fn run(&self, conn: &mut Connection) -> Result<RunReport> {
        match self.run_internal(conn) {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&self, conn: &mut Connection) -> Result<RunReport> {
        let start = Instant::now();
        let input = &self.config.input_path;

        // Extract
        let raw = load_csv(input)?;
        validate_columns(&raw)?;

        // Transform
        let outcome = self.transformer.transform(raw)?;
        let mut cleaned = outcome.frame;
        for action in &outcome.summary.actions {
            info!("  {}", action);
        }

        if let Some(export_path) = &self.config.export_cleaned {
            export_csv(&mut cleaned, export_path)?;
        }

        // Split
        let tables = TableSplitter.split(&cleaned)?;

        // Load
        if self.config.database.create_schema {
            create_tables(conn).context("Creating target tables")?;
        }
        let load_report = load(conn, &tables, &self.config.load)?;
        info!(
            "Load finished with status {:?}: {} rows inserted, committed = {}",
            load_report.status,
            load_report.rows_inserted(),
            load_report.committed
        );

        let report = RunReport::new(
            input.clone(),
            start.elapsed().as_millis() as u64,
            outcome.summary,
            load_report,
        );

        if let Some(report_path) = &self.config.report_path {
            report.write_to_file(report_path)?;
        }

        Ok(report)
    }
}

/// Write the cleaned unified table as a comma-separated CSV with header.
pub fn export_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context(format!("Writing {}", path.display()))?;
    info!("Cleaned data saved: {}", path.display());
    Ok(())
}

/// Builder for creating an [`EtlPipeline`] instance.
#[derive(Debug, Default)]
pub struct EtlPipelineBuilder {
    config: Option<EtlConfig>,
}

impl EtlPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: EtlConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<EtlPipeline> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| EtlError::InvalidConfig(e.to_string()))?;

        Ok(EtlPipeline {
            transformer: Transformer::new(config.transform),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = EtlConfig::default();
        config.transform.rounding_decimals = 42;
        let result = EtlPipeline::builder().config(config).build();
        assert!(matches!(result, Err(EtlError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let config = EtlConfig::builder()
            .input_path("no/such/file.csv")
            .build()
            .unwrap();
        let pipeline = EtlPipeline::builder().config(config).build().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        let result = pipeline.run(&mut conn);
        assert!(matches!(result, Err(EtlError::InputNotFound(_))));
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let mut df = df!["Address" => ["1 Main St"], "Bed" => [3i64]].unwrap();

        export_csv(&mut df, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().next(), Some("Address,Bed"));
        assert_eq!(written.lines().nth(1), Some("1 Main St,3"));
    }
}
