//! Ordered parallel execution over partitions.
//!
//! Workers are completely independent: each owns its partition, there is no
//! shared mutable state and no inter-chunk communication. Results come back
//! in submission order regardless of completion order, so row-order-
//! sensitive columns stay correct after the merge. A worker failing on any
//! partition aborts the whole operation; there is no retry and no partial
//! result.
//!
//! Pool sizes are decided per call, never at init time: the ad-hoc column
//! pathway runs one worker per chunk (chunk count follows data size, not
//! CPU count), while the statistics pathway throttles to two-thirds of the
//! available processing units so the host stays responsive.

use log::debug;

use crate::error::Result;
use crate::partition::partition_by_rows;
use crate::table::TrajectoryTable;

#[cfg(feature = "parallel")]
use crate::error::FeatureError;

/// Number of workers the statistics pathway uses: two-thirds of the
/// available processing units, rounded up, computed at call time.
pub fn stats_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    (cpus * 2).div_ceil(3)
}

/// Run `worker` over every partition on a bounded pool, returning the
/// outputs in submission order.
///
/// The first worker error aborts the whole operation.
#[cfg(feature = "parallel")]
pub fn map_partitions<C, T, F>(partitions: Vec<C>, workers: usize, worker: F) -> Result<Vec<T>>
where
    C: Send,
    T: Send,
    F: Fn(C) -> Result<T> + Send + Sync,
{
    use rayon::prelude::*;

    if partitions.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.max(1);
    debug!(
        "dispatching {} partitions across {} workers",
        partitions.len(),
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| FeatureError::ThreadPool(e.to_string()))?;

    pool.install(|| partitions.into_par_iter().map(&worker).collect())
}

/// Sequential fallback used when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn map_partitions<C, T, F>(partitions: Vec<C>, workers: usize, worker: F) -> Result<Vec<T>>
where
    C: Send,
    T: Send,
    F: Fn(C) -> Result<T> + Send + Sync,
{
    let _ = workers;
    debug!("dispatching {} partitions sequentially", partitions.len());
    partitions.into_iter().map(worker).collect()
}

/// Row-partition a table, run `worker` over every chunk (one worker per
/// chunk) and concatenate the results back in chunk order.
pub fn map_rows_chunked<F>(
    table: &TrajectoryTable,
    chunk_size: usize,
    worker: F,
) -> Result<TrajectoryTable>
where
    F: Fn(TrajectoryTable) -> Result<TrajectoryTable> + Send + Sync,
{
    let chunks = partition_by_rows(table, chunk_size);
    let workers = chunks.len();
    let parts = map_partitions(chunks, workers, worker)?;
    TrajectoryTable::concat(parts)
}
