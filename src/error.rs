//! Unified error handling for trajectory feature computation.
//!
//! All fallible operations in the crate return [`Result`], which wraps
//! [`FeatureError`]. Lookup failures are typed (not formatted strings) so
//! callers can distinguish a missing trajectory from a real failure.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors produced by table construction, feature computation and
/// statistics aggregation.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A lookup referenced a trajectory identifier that is not in the dataset.
    #[error("trajectory id '{traj_id}' does not exist in the dataset")]
    TrajectoryNotFound { traj_id: String },

    /// A required column is not present in the table.
    #[error("column '{column}' is not present in the table")]
    ColumnNotFound { column: String },

    /// A column's length does not match the table's row count.
    #[error("column '{column}' has {actual} values but the table has {expected} rows")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Partial results could not be merged because a column is missing or
    /// differently typed in one of the partitions.
    #[error("column '{column}' is missing or differently typed in one of the partitions")]
    PartitionMismatch { column: String },

    /// The operation requires at least one row.
    #[error("operation requires a non-empty table")]
    EmptyTable,

    /// Timestamps within a trajectory must be non-decreasing.
    #[error("trajectory '{traj_id}' is not sorted by timestamp at row {row}")]
    UnsortedTrajectory { traj_id: String, row: usize },

    /// The worker pool could not be constructed.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
