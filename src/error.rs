// ⚠️ Error Taxonomy - startup failures only
// Per-record resolution failures are data (see aggregate::UnresolvedSummary), not errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A reference or filing table is missing, unreadable, or lacks a required column.
    #[error("failed to load {table} table from {}: {reason}", .path.display())]
    DataLoad {
        table: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// County boundary geometry could not be retrieved or parsed.
    #[error("failed to fetch county boundaries from {source_name}: {reason}")]
    BoundaryFetch { source_name: String, reason: String },

    /// Boundary cache database error.
    #[error("boundary cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

impl PipelineError {
    pub fn data_load(table: &'static str, path: &Path, reason: impl ToString) -> Self {
        PipelineError::DataLoad {
            table,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn boundary_fetch(source_name: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::BoundaryFetch {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that abort initialization
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::DataLoad { .. } | PipelineError::BoundaryFetch { .. }
        )
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
