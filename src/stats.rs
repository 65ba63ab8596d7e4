//! Per-trajectory statistics aggregation.
//!
//! Groups a feature table by trajectory identifier (or by week-based
//! segment), reduces every kinematic feature column to a fixed battery of
//! summary statistics, and pivots the result into one row per group with
//! one column per (feature, statistic) pair for ML consumption.
//!
//! The statistic battery and the pivot column order are explicit, versioned
//! constants ([`Statistic::BATTERY`], [`crate::columns::ORDERED_FEATURES`]),
//! never inferred from data. The pivot is the single place in the crate
//! that imposes deterministic output-column order.

use std::collections::HashMap;

use chrono::Datelike;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::columns;
use crate::error::Result;
use crate::features::generate_kinematic_features;
use crate::parallel::{map_partitions, stats_worker_count};
use crate::partition::partition_by_trajectory;
use crate::table::{FeatureColumn, TrajectoryTable};
use crate::FeatureConfig;

/// A summary statistic in the aggregation battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Count,
    Mean,
    Std,
    Min,
    Q25,
    Median,
    Q75,
    Max,
}

impl Statistic {
    /// The full battery, in canonical order. Std is the sample standard
    /// deviation (ddof = 1); NaN values are excluded from every reduction
    /// and `Count` reports how many values remained.
    pub const BATTERY: [Statistic; 8] = [
        Statistic::Count,
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::Q25,
        Statistic::Median,
        Statistic::Q75,
        Statistic::Max,
    ];

    /// Short label used in pivoted column names.
    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Min => "min",
            Statistic::Q25 => "q25",
            Statistic::Median => "median",
            Statistic::Q75 => "q75",
            Statistic::Max => "max",
        }
    }
}

/// One long-format statistics record: a single (group, feature, statistic)
/// value plus the passthrough target label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    pub group_id: String,
    pub feature: String,
    pub statistic: Statistic,
    pub value: f64,
    pub target: String,
}

/// Long-format statistics table produced by [`generate_kinematic_stats`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsTable {
    pub rows: Vec<StatRow>,
}

/// One row of the wide-format pivot: a group with one value per
/// (feature, statistic) column and the target label last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotedRow {
    pub group_id: String,
    pub values: Vec<f64>,
    pub target: String,
}

/// Wide-format statistics: one row per group, columns in canonical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotedStats {
    pub columns: Vec<String>,
    pub rows: Vec<PivotedRow>,
}

/// Segment identifier for a record: its trajectory plus the ISO week of its
/// timestamp.
fn segment_id(traj_id: &str, timestamp: chrono::DateTime<chrono::Utc>) -> String {
    let week = timestamp.iso_week();
    format!("{}#{}-W{:02}", traj_id, week.year(), week.week())
}

/// Attach a segment-identifier label column splitting every trajectory at
/// calendar (ISO) week boundaries.
///
/// Runs over group-aware partitions with the throttled pool, so a
/// trajectory is never split across workers. The output is grouped by
/// trajectory in first-appearance order.
pub fn segment_traj_by_week(
    table: &TrajectoryTable,
    config: &FeatureConfig,
) -> Result<TrajectoryTable> {
    if table.is_empty() {
        let mut table = table.clone();
        table.insert_column(columns::SEGMENT_ID, FeatureColumn::Label(Vec::new()))?;
        return Ok(table);
    }

    let workers = config.stats_workers.unwrap_or_else(stats_worker_count);
    let partitions = partition_by_trajectory(table, workers);

    let parts = map_partitions(partitions, workers, |mut partition: TrajectoryTable| {
        let ids: Vec<String> = partition
            .points()
            .iter()
            .map(|p| segment_id(&p.traj_id, p.timestamp))
            .collect();
        partition.insert_column(columns::SEGMENT_ID, FeatureColumn::Label(ids))?;
        Ok(partition)
    })?;
    TrajectoryTable::concat(parts)
}

/// Generate the statistics of every kinematic feature for each unique
/// trajectory (or, with `by_segment`, for each trajectory-week segment).
///
/// The full kinematic feature chain is computed first, so the input table
/// needs none of the feature columns up front. `target_col` names the label
/// column carried through for supervised ML use; it must be present. The
/// reduction runs over group-aware partitions with the pool throttled to
/// two-thirds of the available processing units (override with
/// [`FeatureConfig::stats_workers`]).
pub fn generate_kinematic_stats(
    table: &TrajectoryTable,
    target_col: &str,
    by_segment: bool,
    config: &FeatureConfig,
) -> Result<StatsTable> {
    let table = generate_kinematic_features(table, config)?;
    let table = if by_segment && !table.has_column(columns::SEGMENT_ID) {
        segment_traj_by_week(&table, config)?
    } else {
        table
    };

    if !table.is_empty() {
        // Surface a typed error before dispatching workers.
        table.label_column(target_col)?;
    }

    let workers = config.stats_workers.unwrap_or_else(stats_worker_count);
    let partitions = partition_by_trajectory(&table, workers);
    debug!(
        "aggregating {} rows across {} group partitions",
        table.len(),
        partitions.len()
    );

    let parts = map_partitions(partitions, workers, |partition: TrajectoryTable| {
        partition_stats(&partition, target_col, by_segment)
    })?;

    Ok(StatsTable {
        rows: parts.into_iter().flatten().collect(),
    })
}

/// Reduce one group partition to long-format stat rows.
fn partition_stats(
    partition: &TrajectoryTable,
    target_col: &str,
    by_segment: bool,
) -> Result<Vec<StatRow>> {
    let targets = partition.label_column(target_col)?;
    let group_keys: Vec<String> = if by_segment {
        partition.label_column(columns::SEGMENT_ID)?.to_vec()
    } else {
        partition
            .points()
            .iter()
            .map(|p| p.traj_id.clone())
            .collect()
    };

    // Group row indices by key, preserving first-appearance order.
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, key) in group_keys.iter().enumerate() {
        members
            .entry(key.as_str())
            .or_insert_with(|| {
                order.push(key.as_str());
                Vec::new()
            })
            .push(i);
    }

    let mut out = Vec::new();
    for key in order {
        let rows = &members[key];
        let target = targets[rows[0]].clone();
        for feature in columns::ORDERED_FEATURES {
            let values = partition.float_column(feature)?;
            let mut group_values: Vec<f64> = rows
                .iter()
                .map(|&i| values[i])
                .filter(|v| !v.is_nan())
                .collect();
            group_values.sort_by(f64::total_cmp);

            for statistic in Statistic::BATTERY {
                out.push(StatRow {
                    group_id: key.to_string(),
                    feature: feature.to_string(),
                    statistic,
                    value: compute_statistic(&group_values, statistic),
                    target: target.clone(),
                });
            }
        }
    }
    Ok(out)
}

/// Reduce a sorted, NaN-free value slice to one statistic.
fn compute_statistic(sorted: &[f64], statistic: Statistic) -> f64 {
    if sorted.is_empty() {
        return match statistic {
            Statistic::Count => 0.0,
            _ => f64::NAN,
        };
    }
    let n = sorted.len();
    match statistic {
        Statistic::Count => n as f64,
        Statistic::Mean => sorted.iter().sum::<f64>() / n as f64,
        Statistic::Std => {
            if n < 2 {
                f64::NAN
            } else {
                let mean = sorted.iter().sum::<f64>() / n as f64;
                let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (n - 1) as f64).sqrt()
            }
        }
        Statistic::Min => sorted[0],
        Statistic::Q25 => quantile(sorted, 0.25),
        Statistic::Median => quantile(sorted, 0.5),
        Statistic::Q75 => quantile(sorted, 0.75),
        Statistic::Max => sorted[n - 1],
    }
}

/// Linear-interpolation quantile over a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Pivot a long-format statistics table into wide format: one row per
/// group, one column per (feature, statistic) pair named
/// `{feature}_{statistic}`, with the target column re-attached last.
///
/// Column order is canonical regardless of row insertion order:
/// feature-major over [`crate::columns::ORDERED_FEATURES`], statistic-minor
/// over [`Statistic::BATTERY`]. Pivoting the same battery twice always
/// yields the same column order. Missing (group, feature, statistic)
/// combinations become NaN.
pub fn pivot_stats_df(stats: &StatsTable, target_col: &str) -> PivotedStats {
    let mut columns_out: Vec<String> = Vec::new();
    for feature in columns::ORDERED_FEATURES {
        for statistic in Statistic::BATTERY {
            columns_out.push(format!("{}_{}", feature, statistic.label()));
        }
    }
    columns_out.push(target_col.to_string());

    let mut lookup: HashMap<(&str, &str, Statistic), f64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut targets: HashMap<&str, &str> = HashMap::new();
    for row in &stats.rows {
        lookup.insert(
            (row.group_id.as_str(), row.feature.as_str(), row.statistic),
            row.value,
        );
        if !targets.contains_key(row.group_id.as_str()) {
            order.push(row.group_id.as_str());
            targets.insert(row.group_id.as_str(), row.target.as_str());
        }
    }

    let rows = order
        .into_iter()
        .map(|group| {
            let mut values = Vec::with_capacity(columns_out.len() - 1);
            for feature in columns::ORDERED_FEATURES {
                for statistic in Statistic::BATTERY {
                    values.push(
                        lookup
                            .get(&(group, feature, statistic))
                            .copied()
                            .unwrap_or(f64::NAN),
                    );
                }
            }
            PivotedRow {
                group_id: group.to_string(),
                values,
                target: targets[group].to_string(),
            }
        })
        .collect();

    PivotedStats {
        columns: columns_out,
        rows,
    }
}
