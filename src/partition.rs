//! Table partitioning.
//!
//! Two policies:
//! - row-count partitioning cuts strictly by position, ignoring trajectory
//!   boundaries (used by the ad-hoc column computations);
//! - group-aware partitioning assigns whole trajectories to partitions,
//!   never splitting one (used by the segmentation/statistics pathway,
//!   where a chunk's first row is treated as a sequence start).

use std::collections::HashSet;

use log::debug;

use crate::table::TrajectoryTable;

/// Split a table into contiguous chunks of at most `max_rows` rows.
///
/// Concatenating the chunks in order reproduces the input exactly, for any
/// ceiling >= 1 and any table size. Chunks are cut by position only: a
/// trajectory whose records straddle a chunk boundary will be treated by
/// the from-previous workers as restarting at the boundary. That reset is
/// accepted for parallel throughput on very large single-trajectory
/// datasets; use [`partition_by_trajectory`] when it is not acceptable.
pub fn partition_by_rows(table: &TrajectoryTable, max_rows: usize) -> Vec<TrajectoryTable> {
    let max_rows = max_rows.max(1);
    if table.is_empty() {
        // One empty chunk so workers still attach their (empty) column.
        return vec![table.clone()];
    }

    let mut chunks = Vec::with_capacity(table.len().div_ceil(max_rows));
    let mut start = 0;
    while start < table.len() {
        let end = (start + max_rows).min(table.len());
        chunks.push(table.slice_rows(start..end));
        start = end;
    }
    debug!(
        "partitioned {} rows into {} chunks (ceiling {})",
        table.len(),
        chunks.len(),
        max_rows
    );
    chunks
}

/// Distribute whole trajectory groups over at most `max_partitions`
/// partitions.
///
/// A partition may hold several whole trajectories but never a fractional
/// one, so each partition's first row really is a sequence start. Rows
/// within a trajectory keep their original order; output partitions follow
/// the trajectories' first-appearance order.
pub fn partition_by_trajectory(
    table: &TrajectoryTable,
    max_partitions: usize,
) -> Vec<TrajectoryTable> {
    let ids = table.trajectory_ids();
    if ids.is_empty() {
        return Vec::new();
    }

    let max_partitions = max_partitions.max(1);
    let groups_per_partition = ids.len().div_ceil(max_partitions);

    let mut partitions = Vec::new();
    for id_slice in ids.chunks(groups_per_partition) {
        let members: HashSet<&str> = id_slice.iter().map(String::as_str).collect();
        let indices: Vec<usize> = table
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| members.contains(p.traj_id.as_str()))
            .map(|(i, _)| i)
            .collect();
        partitions.push(table.gather_rows(&indices));
    }
    debug!(
        "partitioned {} trajectories into {} group partitions",
        ids.len(),
        partitions.len()
    );
    partitions
}
