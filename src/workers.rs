//! Per-chunk worker functions.
//!
//! Each worker takes one owned chunk and returns it with exactly one new
//! feature column attached. A chunk's first row, and any row where the
//! trajectory identifier changes, is a sequence start: the distance family
//! resets to 0 there and bearing has no previous heading (NaN).

use crate::columns;
use crate::error::Result;
use crate::geo::{haversine_km, initial_bearing_deg};
use crate::table::{FeatureColumn, TrajectoryTable};

/// True when row `i` starts a new sequence within the chunk.
fn sequence_start(chunk: &TrajectoryTable, i: usize) -> bool {
    i == 0 || chunk.points()[i].traj_id != chunk.points()[i - 1].traj_id
}

/// Great-circle distance from the previous record, 0 at sequence starts.
pub(crate) fn consecutive_distance_chunk(mut chunk: TrajectoryTable) -> Result<TrajectoryTable> {
    let values: Vec<f64> = (0..chunk.len())
        .map(|i| {
            if sequence_start(&chunk, i) {
                0.0
            } else {
                let prev = &chunk.points()[i - 1];
                let curr = &chunk.points()[i];
                haversine_km(prev.latitude, prev.longitude, curr.latitude, curr.longitude)
            }
        })
        .collect();
    chunk.insert_column(columns::DISTANCE_PREV_TO_CURR, FeatureColumn::Float(values))?;
    Ok(chunk)
}

/// Great-circle distance from the sequence's first record, 0 at sequence
/// starts.
pub(crate) fn start_distance_chunk(mut chunk: TrajectoryTable) -> Result<TrajectoryTable> {
    let mut values = Vec::with_capacity(chunk.len());
    let mut start = 0;
    for i in 0..chunk.len() {
        if sequence_start(&chunk, i) {
            start = i;
            values.push(0.0);
        } else {
            let origin = &chunk.points()[start];
            let curr = &chunk.points()[i];
            values.push(haversine_km(
                origin.latitude,
                origin.longitude,
                curr.latitude,
                curr.longitude,
            ));
        }
    }
    chunk.insert_column(columns::DISTANCE_FROM_START, FeatureColumn::Float(values))?;
    Ok(chunk)
}

/// Great-circle distance from a fixed reference coordinate to every record.
pub(crate) fn point_distance_chunk(
    mut chunk: TrajectoryTable,
    coordinates: (f64, f64),
) -> Result<TrajectoryTable> {
    let (ref_lat, ref_lon) = coordinates;
    let values: Vec<f64> = chunk
        .points()
        .iter()
        .map(|p| haversine_km(ref_lat, ref_lon, p.latitude, p.longitude))
        .collect();
    chunk.insert_column(columns::DISTANCE_FROM_POINT, FeatureColumn::Float(values))?;
    Ok(chunk)
}

/// Flag records within `dist_range` km of the reference coordinate.
///
/// Reuses an existing distance-from-point column when present, otherwise
/// computes the distances internally without attaching them.
pub(crate) fn within_range_chunk(
    mut chunk: TrajectoryTable,
    coordinates: (f64, f64),
    dist_range: f64,
) -> Result<TrajectoryTable> {
    let flags: Vec<bool> = match chunk.float_column(columns::DISTANCE_FROM_POINT) {
        Ok(distances) => distances.iter().map(|&d| d <= dist_range).collect(),
        Err(_) => {
            let (ref_lat, ref_lon) = coordinates;
            chunk
                .points()
                .iter()
                .map(|p| {
                    haversine_km(ref_lat, ref_lon, p.latitude, p.longitude) <= dist_range
                })
                .collect()
        }
    };
    chunk.insert_column(columns::WITHIN_RANGE, FeatureColumn::Flag(flags))?;
    Ok(chunk)
}

/// Initial bearing from the previous record, NaN at sequence starts.
pub(crate) fn bearing_chunk(mut chunk: TrajectoryTable) -> Result<TrajectoryTable> {
    let values: Vec<f64> = (0..chunk.len())
        .map(|i| {
            if sequence_start(&chunk, i) {
                f64::NAN
            } else {
                let prev = &chunk.points()[i - 1];
                let curr = &chunk.points()[i];
                initial_bearing_deg(prev.latitude, prev.longitude, curr.latitude, curr.longitude)
            }
        })
        .collect();
    chunk.insert_column(columns::BEARING, FeatureColumn::Float(values))?;
    Ok(chunk)
}
