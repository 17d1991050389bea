//! End-to-end ETL orchestration.
//!
//! Sequences the stages: load & validate -> persist `raw` -> feature
//! engineering -> persist `features` -> index creation. Any stage failure
//! aborts the run; validation failures abort before anything is written.
//! A failure after `raw` was persisted leaves `raw` in place and `features`
//! untouched; callers needing all-or-nothing across both tables must wrap
//! the run in their own transaction boundary.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineError;
use crate::features;
use crate::store::TelemetryStore;
use crate::validate;

/// CSV -> SQLite ETL with feature engineering for EV fleet telemetry.
pub struct Pipeline {
    db_path: PathBuf,
}

impl Pipeline {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Pipeline {
            db_path: db_path.into(),
        }
    }

    /// Runs the full ETL over one input batch.
    ///
    /// Returns `(raw_row_count, feature_row_count)`; the two are always
    /// equal because feature engineering adds columns, never rows.
    pub fn run(&self, csv_path: &Path) -> Result<(usize, usize), PipelineError> {
        let raw = validate::load_csv(csv_path)?;
        let raw_count = raw.len();
        info!(rows = raw_count, input = %csv_path.display(), "Batch validated");

        let mut store = TelemetryStore::open(&self.db_path)?;
        store.persist_raw(&raw)?;

        let engineered = features::engineer(raw);
        store.persist_features(&engineered)?;
        store.ensure_indices()?;

        info!(
            raw_rows = raw_count,
            feature_rows = engineered.len(),
            db = %self.db_path.display(),
            "ETL run complete"
        );
        Ok((raw_count, engineered.len()))
    }
}
