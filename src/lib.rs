//! # Trackfeat
//!
//! Parallel spatial and kinematic feature extraction for GPS trajectory
//! tables.
//!
//! This library provides:
//! - Great-circle distance and bearing formulas
//! - Per-row feature columns (consecutive distance, distance from start,
//!   distance from a fixed point, range membership, speed, acceleration,
//!   jerk, bearing, bearing rate)
//! - A partition-compute-merge executor that parallelizes column
//!   computations over row chunks while preserving row order
//! - Per-trajectory summary statistics with a canonical wide-format pivot
//!   for ML pipelines
//!
//! ## Features
//!
//! - **`parallel`** (default) - Enable parallel processing with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use trackfeat::{columns, create_speed_from_prev_column, FeatureConfig};
//! use trackfeat::{TrajectoryPoint, TrajectoryTable};
//!
//! // One trajectory: one degree of longitude along the equator in an hour.
//! let points = vec![
//!     TrajectoryPoint::new("walk-1", Utc.timestamp_opt(0, 0).unwrap(), 0.0, 0.0),
//!     TrajectoryPoint::new("walk-1", Utc.timestamp_opt(3600, 0).unwrap(), 0.0, 1.0),
//! ];
//! let table = TrajectoryTable::from_points(points).unwrap();
//!
//! let table = create_speed_from_prev_column(&table, &FeatureConfig::default()).unwrap();
//! let speed = table.float_column(columns::SPEED_PREV_TO_CURR).unwrap();
//! assert!((speed[1] - 111.19 / 3600.0).abs() < 1e-4); // km/s
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{FeatureError, Result};

// Great-circle formula library
pub mod geo;

// Trajectory table container
pub mod table;
pub use table::{FeatureColumn, TrajectoryTable};

// Table partitioning policies
pub mod partition;
pub use partition::{partition_by_rows, partition_by_trajectory};

// Ordered parallel execution over partitions
pub mod parallel;
pub use parallel::{map_partitions, map_rows_chunked, stats_worker_count};

// Per-chunk worker functions
mod workers;

// Public feature operations
pub mod features;
pub use features::{
    create_acceleration_from_prev_column, create_bearing_column, create_bearing_rate_column,
    create_distance_between_consecutive_column, create_distance_from_given_point_column,
    create_distance_from_start_column, create_jerk_from_prev_column,
    create_point_within_range_column, create_speed_from_prev_column, generate_kinematic_features,
    get_bounding_box, get_distance_by_date_and_traj_id, get_end_location, get_start_location,
};

// Per-trajectory statistics aggregation
pub mod stats;
pub use stats::{
    generate_kinematic_stats, pivot_stats_df, segment_traj_by_week, PivotedRow, PivotedStats,
    StatRow, Statistic, StatsTable,
};

/// Feature column names attached by the pipeline.
pub mod columns {
    /// Great-circle distance from the previous record (km).
    pub const DISTANCE_PREV_TO_CURR: &str = "distance_prev_to_curr";
    /// Great-circle distance from the sequence's first record (km).
    pub const DISTANCE_FROM_START: &str = "distance_from_start";
    /// Great-circle distance from a fixed reference coordinate (km).
    pub const DISTANCE_FROM_POINT: &str = "distance_from_point";
    /// Membership flag: within range of the reference coordinate.
    pub const WITHIN_RANGE: &str = "within_range";
    /// Speed from the previous record (km/s).
    pub const SPEED_PREV_TO_CURR: &str = "speed_prev_to_curr";
    /// Acceleration from the previous record (km/s²).
    pub const ACCELERATION_PREV_TO_CURR: &str = "acceleration_prev_to_curr";
    /// Jerk from the previous record (km/s³).
    pub const JERK_PREV_TO_CURR: &str = "jerk_prev_to_curr";
    /// Initial bearing from the previous record (degrees, [0, 360)).
    pub const BEARING: &str = "bearing";
    /// Bearing rate from the previous record (degrees/s).
    pub const BEARING_RATE: &str = "bearing_rate";
    /// Week-segment identifier label.
    pub const SEGMENT_ID: &str = "seg_id";

    /// Canonical feature order used by the statistics aggregator and the
    /// pivot. Versioned configuration, never inferred from data.
    pub const ORDERED_FEATURES: [&str; 7] = [
        DISTANCE_PREV_TO_CURR,
        DISTANCE_FROM_START,
        SPEED_PREV_TO_CURR,
        ACCELERATION_PREV_TO_CURR,
        JERK_PREV_TO_CURR,
        BEARING,
        BEARING_RATE,
    ];
}

// ============================================================================
// Core Types
// ============================================================================

/// A single time-stamped GPS record belonging to one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Identifier of the moving object's trajectory.
    pub traj_id: String,
    /// Capture time. Non-decreasing within a trajectory, not globally.
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

impl TrajectoryPoint {
    /// Create a new trajectory record.
    pub fn new(
        traj_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            traj_id: traj_id.into(),
            timestamp,
            latitude,
            longitude,
        }
    }

    /// Check if the record has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Compute the bounding box of a record set. `None` when empty.
    pub fn from_points(points: &[TrajectoryPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lon = min_lon.min(p.longitude);
            max_lon = max_lon.max(p.longitude);
        }

        Some(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    /// The box as a (min lat, min lon, max lat, max lon) tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_lat, self.min_lon, self.max_lat, self.max_lon)
    }
}

/// Configuration for the partition-compute-merge pipeline.
///
/// Computed or injected at call time; there is no process-wide tunable.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Row ceiling per chunk for the ad-hoc column computations. Balances
    /// per-worker overhead against parallelism.
    /// Default: 75 000 rows
    pub chunk_size: usize,

    /// Worker count for the statistics pathway. `None` falls back to
    /// two-thirds of the available processing units (rounded up), keeping
    /// headroom so the host system stays responsive.
    pub stats_workers: Option<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            chunk_size: 75_000,
            stats_workers: None,
        }
    }
}
