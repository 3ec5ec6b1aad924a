//! Dataset Store
//!
//! Holds the single in-memory table loaded from Parquet at startup. Nothing
//! writes to it afterwards, so every query gets its own SQL context over a
//! cheap clone of the frame and no locking is needed.

use crate::config::DatasetConfig;
use crate::error::{QaError, Result};
use chrono::{DateTime, Utc};
use polars::io::cloud::CloudOptions;
use polars::prelude::*;
use polars::sql::SQLContext;
use tracing::{debug, info};

pub struct DatasetStore {
    table_name: String,
    frame: DataFrame,
    columns: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl DatasetStore {
    /// Bulk-load every file matching `config.parquet_path`. One attempt; any
    /// failure is returned to the caller, which treats it as fatal.
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        info!("Loading Parquet data from {}", config.parquet_path);

        let cloud_options = if config.is_remote() {
            let options = CloudOptions::from_untyped_config(
                &config.parquet_path,
                config.storage_options(),
            )
            .map_err(|e| QaError::Dataset(format!("Invalid storage options: {}", e)))?;
            Some(options)
        } else {
            None
        };

        let args = ScanArgsParquet {
            cloud_options,
            ..Default::default()
        };

        let frame = LazyFrame::scan_parquet(&config.parquet_path, args)
            .map_err(|e| QaError::Dataset(format!("Failed to scan Parquet: {}", e)))?
            .collect()
            .map_err(|e| QaError::Dataset(format!("Failed to load Parquet: {}", e)))?;

        let store = Self::from_frame(&config.table_name, frame);
        info!(
            "Parquet data loaded into '{}' ({} rows, {} columns)",
            store.table_name,
            store.row_count(),
            store.columns.len()
        );
        Ok(store)
    }

    pub fn from_frame(table_name: &str, frame: DataFrame) -> Self {
        let columns = frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            table_name: table_name.to_string(),
            frame,
            columns,
            loaded_at: Utc::now(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Column names in table order, captured at load.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Run a query against the table and materialize the whole result.
    pub fn execute(&self, sql: &str) -> Result<DataFrame> {
        debug!("Executing against '{}': {}", self.table_name, sql);
        let mut ctx = SQLContext::new();
        ctx.register(&self.table_name, self.frame.clone().lazy());
        let df = ctx.execute(sql)?.collect()?;
        Ok(df)
    }
}
