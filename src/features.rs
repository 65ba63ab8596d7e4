//! Public feature operations over trajectory tables.
//!
//! This module provides the core feature-extraction entry points:
//! - scalar lookups (bounding box, start/end location, distance on a date)
//! - parallel column computations (distance family, range membership,
//!   bearing), row-partitioned and merged in order
//! - the sequential speed/acceleration/jerk chain with explicit
//!   missing-column recovery
//!
//! Missing prerequisite columns are recomputed through the full chain
//! rather than reported as errors: asking for jerk on a bare table computes
//! distance, then speed, then acceleration first. This costs silent extra
//! computation and is intentional, documented behavior.

use chrono::NaiveDate;

use crate::columns;
use crate::error::{FeatureError, Result};
use crate::geo::haversine_km;
use crate::parallel::map_rows_chunked;
use crate::table::{FeatureColumn, TrajectoryTable};
use crate::workers;
use crate::{BoundingBox, FeatureConfig};

/// Bounding box of the whole dataset as (min lat, min lon, max lat, max lon).
pub fn get_bounding_box(table: &TrajectoryTable) -> Result<BoundingBox> {
    BoundingBox::from_points(table.points()).ok_or(FeatureError::EmptyTable)
}

/// Starting (lat, lon) of a trajectory, or of the whole dataset when no
/// identifier is given.
///
/// The start is the record with the earliest timestamp; ties resolve to the
/// first such record in table order.
pub fn get_start_location(table: &TrajectoryTable, traj_id: Option<&str>) -> Result<(f64, f64)> {
    extreme_location(table, traj_id, |candidate, best| candidate < best)
}

/// Ending (lat, lon) of a trajectory, or of the whole dataset when no
/// identifier is given.
pub fn get_end_location(table: &TrajectoryTable, traj_id: Option<&str>) -> Result<(f64, f64)> {
    extreme_location(table, traj_id, |candidate, best| candidate > best)
}

fn extreme_location(
    table: &TrajectoryTable,
    traj_id: Option<&str>,
    better: impl Fn(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) -> bool,
) -> Result<(f64, f64)> {
    let mut best: Option<&crate::TrajectoryPoint> = None;
    for point in table.points() {
        if let Some(id) = traj_id {
            if point.traj_id != id {
                continue;
            }
        }
        match best {
            Some(b) if !better(point.timestamp, b.timestamp) => {}
            _ => best = Some(point),
        }
    }

    match best {
        Some(point) => Ok((point.latitude, point.longitude)),
        None => match traj_id {
            Some(id) => Err(FeatureError::TrajectoryNotFound {
                traj_id: id.to_string(),
            }),
            None => Err(FeatureError::EmptyTable),
        },
    }
}

/// Total great-circle distance covered on a given date, optionally
/// restricted to one trajectory.
///
/// Consecutive distances restart at trajectory changes, so an unrestricted
/// call over a multi-trajectory day never counts the jump between two
/// different objects as covered distance.
pub fn get_distance_by_date_and_traj_id(
    table: &TrajectoryTable,
    date: NaiveDate,
    traj_id: Option<&str>,
) -> Result<f64> {
    if let Some(id) = traj_id {
        if !table.contains_trajectory(id) {
            return Err(FeatureError::TrajectoryNotFound {
                traj_id: id.to_string(),
            });
        }
    }

    let day_points: Vec<&crate::TrajectoryPoint> = table
        .points()
        .iter()
        .filter(|p| p.timestamp.date_naive() == date)
        .filter(|p| traj_id.is_none_or(|id| p.traj_id == id))
        .collect();

    let mut total = 0.0;
    for pair in day_points.windows(2) {
        if pair[0].traj_id == pair[1].traj_id {
            total += haversine_km(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            );
        }
    }
    Ok(total)
}

/// Attach the distance between consecutive records (km), computed in
/// parallel over row-count chunks.
///
/// Each chunk's first row is treated as a sequence start (distance 0), so a
/// trajectory straddling a chunk boundary restarts there; see
/// [`crate::partition::partition_by_rows`].
pub fn create_distance_between_consecutive_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    map_rows_chunked(table, config.chunk_size, workers::consecutive_distance_chunk)
}

/// Attach the distance from each sequence's first record (km), computed in
/// parallel over row-count chunks. Same chunk-boundary reset as
/// [`create_distance_between_consecutive_column`].
pub fn create_distance_from_start_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    map_rows_chunked(table, config.chunk_size, workers::start_distance_chunk)
}

/// Attach the distance (km) from a fixed (lat, lon) reference to every
/// record. No ordering dependency; trivially parallel.
pub fn create_distance_from_given_point_column(
    table: &TrajectoryTable,
    coordinates: (f64, f64),
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    map_rows_chunked(table, config.chunk_size, move |chunk| {
        workers::point_distance_chunk(chunk, coordinates)
    })
}

/// Attach a flag column marking records within `dist_range` km of the
/// reference coordinate.
///
/// An existing distance-from-point column is reused as-is; callers must
/// ensure it was computed against the same reference coordinate. Without
/// one, distances are computed internally and not attached.
pub fn create_point_within_range_column(
    table: &TrajectoryTable,
    coordinates: (f64, f64),
    dist_range: f64,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    map_rows_chunked(table, config.chunk_size, move |chunk| {
        workers::within_range_chunk(chunk, coordinates, dist_range)
    })
}

/// Attach the speed from the previous record (km/s).
///
/// Computes the consecutive-distance column first if absent. A zero time
/// delta (duplicate timestamps) yields a non-finite speed; such values are
/// left in the output as a data-quality signal, never silently zeroed.
pub fn create_speed_from_prev_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    let mut table = if table.has_column(columns::DISTANCE_PREV_TO_CURR) {
        table.clone()
    } else {
        create_distance_between_consecutive_column(table, config)?
    };

    let speeds: Vec<f64> = {
        let deltas = table.time_delta_seconds();
        let distances = table.float_column(columns::DISTANCE_PREV_TO_CURR)?;
        distances
            .iter()
            .zip(deltas.iter())
            .map(|(d, dt)| d / dt)
            .collect()
    };
    table.insert_column(columns::SPEED_PREV_TO_CURR, FeatureColumn::Float(speeds))?;
    Ok(table)
}

/// Attach the acceleration from the previous record (km/s²).
///
/// Computes the speed column first if absent (which in turn may compute
/// distance). The first row has no previous speed and gets NaN.
pub fn create_acceleration_from_prev_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    let mut table = if table.has_column(columns::SPEED_PREV_TO_CURR) {
        table.clone()
    } else {
        create_speed_from_prev_column(table, config)?
    };

    let values = diff_over_time(&table, columns::SPEED_PREV_TO_CURR)?;
    table.insert_column(
        columns::ACCELERATION_PREV_TO_CURR,
        FeatureColumn::Float(values),
    )?;
    Ok(table)
}

/// Attach the jerk from the previous record (km/s³).
///
/// Fallback chain is three levels deep: jerk needs acceleration, which
/// needs speed, which needs distance.
pub fn create_jerk_from_prev_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    let mut table = if table.has_column(columns::ACCELERATION_PREV_TO_CURR) {
        table.clone()
    } else {
        create_acceleration_from_prev_column(table, config)?
    };

    let values = diff_over_time(&table, columns::ACCELERATION_PREV_TO_CURR)?;
    table.insert_column(columns::JERK_PREV_TO_CURR, FeatureColumn::Float(values))?;
    Ok(table)
}

/// Attach the initial bearing from the previous record (degrees, [0, 360)),
/// computed in parallel over row-count chunks. Sequence starts have no
/// previous heading and get NaN.
pub fn create_bearing_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    map_rows_chunked(table, config.chunk_size, workers::bearing_chunk)
}

/// Attach the bearing rate from the previous record (degrees/s).
///
/// Computes the bearing column first if absent.
pub fn create_bearing_rate_column(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    let mut table = if table.has_column(columns::BEARING) {
        table.clone()
    } else {
        create_bearing_column(table, config)?
    };

    let values = diff_over_time(&table, columns::BEARING)?;
    table.insert_column(columns::BEARING_RATE, FeatureColumn::Float(values))?;
    Ok(table)
}

/// Run the full kinematic feature chain in one pass: consecutive distance,
/// distance from start, speed, acceleration, jerk, bearing and bearing
/// rate. The statistics aggregator uses this to guarantee its input
/// columns.
pub fn generate_kinematic_features(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    let table = create_distance_between_consecutive_column(table, config)?;
    let table = create_distance_from_start_column(&table, config)?;
    let table = create_speed_from_prev_column(&table, config)?;
    let table = create_acceleration_from_prev_column(&table, config)?;
    let table = create_jerk_from_prev_column(&table, config)?;
    let table = create_bearing_column(&table, config)?;
    create_bearing_rate_column(&table, config)
}

/// Consecutive difference of a float column divided by the time delta to
/// the previous record. Row 0 gets NaN.
fn diff_over_time(table: &TrajectoryTable, column: &str) -> Result<Vec<f64>> {
    let deltas = table.time_delta_seconds();
    let values = table.float_column(column)?;
    Ok((0..values.len())
        .map(|i| {
            if i == 0 {
                f64::NAN
            } else {
                (values[i] - values[i - 1]) / deltas[i]
            }
        })
        .collect())
}
