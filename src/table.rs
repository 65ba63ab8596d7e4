//! In-memory trajectory table.
//!
//! The table is the unit of work for the whole pipeline: an ordered
//! sequence of time-stamped GPS records plus named feature columns, each
//! exactly as long as the record vector. Partitioning slices it, workers
//! append columns to their slice, and the executor concatenates the slices
//! back in submission order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::error::{FeatureError, Result};
use crate::TrajectoryPoint;

/// A named derived column attached to every record of a table.
///
/// Float columns hold kinematic values, flag columns hold membership tests
/// (e.g. point-within-range) and label columns hold opaque strings such as
/// ML target classes or week-segment identifiers.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    Float(Vec<f64>),
    Flag(Vec<bool>),
    Label(Vec<String>),
}

impl FeatureColumn {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Float(v) => v.len(),
            FeatureColumn::Flag(v) => v.len(),
            FeatureColumn::Label(v) => v.len(),
        }
    }

    /// Whether the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, range: Range<usize>) -> FeatureColumn {
        match self {
            FeatureColumn::Float(v) => FeatureColumn::Float(v[range].to_vec()),
            FeatureColumn::Flag(v) => FeatureColumn::Flag(v[range].to_vec()),
            FeatureColumn::Label(v) => FeatureColumn::Label(v[range].to_vec()),
        }
    }

    fn gather(&self, indices: &[usize]) -> FeatureColumn {
        match self {
            FeatureColumn::Float(v) => {
                FeatureColumn::Float(indices.iter().map(|&i| v[i]).collect())
            }
            FeatureColumn::Flag(v) => FeatureColumn::Flag(indices.iter().map(|&i| v[i]).collect()),
            FeatureColumn::Label(v) => {
                FeatureColumn::Label(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Append another column of the same kind. Returns false on a kind
    /// mismatch, leaving self untouched.
    fn append(&mut self, other: FeatureColumn) -> bool {
        match (self, other) {
            (FeatureColumn::Float(a), FeatureColumn::Float(b)) => {
                a.extend(b);
                true
            }
            (FeatureColumn::Flag(a), FeatureColumn::Flag(b)) => {
                a.extend(b);
                true
            }
            (FeatureColumn::Label(a), FeatureColumn::Label(b)) => {
                a.extend(b);
                true
            }
            _ => false,
        }
    }
}

/// An ordered trajectory table: records plus named feature columns.
///
/// Invariant, checked at construction: within each trajectory identifier,
/// timestamps are non-decreasing. Row order is preserved by every
/// transform in the crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryTable {
    points: Vec<TrajectoryPoint>,
    columns: BTreeMap<String, FeatureColumn>,
}

impl TrajectoryTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records, validating the per-trajectory ordering
    /// invariant.
    pub fn from_points(points: Vec<TrajectoryPoint>) -> Result<Self> {
        let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for (row, point) in points.iter().enumerate() {
            if let Some(prev) = last_seen.get(point.traj_id.as_str()) {
                if point.timestamp < *prev {
                    return Err(FeatureError::UnsortedTrajectory {
                        traj_id: point.traj_id.clone(),
                        row,
                    });
                }
            }
            last_seen.insert(point.traj_id.as_str(), point.timestamp);
        }
        drop(last_seen);

        Ok(Self {
            points,
            columns: BTreeMap::new(),
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The records, in table order.
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// Names of all feature columns, in deterministic (sorted) order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Whether a feature column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Look up a feature column by name.
    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.get(name)
    }

    /// A float column's values, or a typed error if absent or not float.
    pub fn float_column(&self, name: &str) -> Result<&[f64]> {
        match self.columns.get(name) {
            Some(FeatureColumn::Float(v)) => Ok(v),
            _ => Err(FeatureError::ColumnNotFound {
                column: name.to_string(),
            }),
        }
    }

    /// A flag column's values, or a typed error if absent or not flag.
    pub fn flag_column(&self, name: &str) -> Result<&[bool]> {
        match self.columns.get(name) {
            Some(FeatureColumn::Flag(v)) => Ok(v),
            _ => Err(FeatureError::ColumnNotFound {
                column: name.to_string(),
            }),
        }
    }

    /// A label column's values, or a typed error if absent or not label.
    pub fn label_column(&self, name: &str) -> Result<&[String]> {
        match self.columns.get(name) {
            Some(FeatureColumn::Label(v)) => Ok(v),
            _ => Err(FeatureError::ColumnNotFound {
                column: name.to_string(),
            }),
        }
    }

    /// Attach a feature column, replacing any existing column of the same
    /// name. The column must be exactly as long as the table.
    pub fn insert_column(&mut self, name: impl Into<String>, column: FeatureColumn) -> Result<()> {
        let name = name.into();
        if column.len() != self.points.len() {
            return Err(FeatureError::ColumnLengthMismatch {
                column: name,
                expected: self.points.len(),
                actual: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Remove a feature column, returning it if present.
    pub fn remove_column(&mut self, name: &str) -> Option<FeatureColumn> {
        self.columns.remove(name)
    }

    /// Copy out a contiguous row range, carrying all feature columns.
    pub fn slice_rows(&self, range: Range<usize>) -> TrajectoryTable {
        TrajectoryTable {
            points: self.points[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.slice(range.clone())))
                .collect(),
        }
    }

    /// Copy out the rows at the given indices, carrying all feature columns.
    pub fn gather_rows(&self, indices: &[usize]) -> TrajectoryTable {
        TrajectoryTable {
            points: indices.iter().map(|&i| self.points[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.gather(indices)))
                .collect(),
        }
    }

    /// Unique trajectory identifiers in first-appearance order.
    pub fn trajectory_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for point in &self.points {
            if seen.insert(point.traj_id.as_str()) {
                ids.push(point.traj_id.clone());
            }
        }
        ids
    }

    /// Whether any record carries this trajectory identifier.
    pub fn contains_trajectory(&self, traj_id: &str) -> bool {
        self.points.iter().any(|p| p.traj_id == traj_id)
    }

    /// Concatenate partitions in order into one table.
    ///
    /// Every partition must carry the same set of columns with matching
    /// kinds; the merge preserves partition submission order so that
    /// row-order-sensitive columns stay aligned.
    pub fn concat(partitions: Vec<TrajectoryTable>) -> Result<TrajectoryTable> {
        let mut iter = partitions.into_iter();
        let mut merged = match iter.next() {
            Some(first) => first,
            None => return Ok(TrajectoryTable::new()),
        };

        for partition in iter {
            if partition.columns.len() != merged.columns.len() {
                let column = column_set_difference(&merged, &partition);
                return Err(FeatureError::PartitionMismatch { column });
            }
            merged.points.extend(partition.points);
            for (name, incoming) in partition.columns {
                let matched = match merged.columns.get_mut(&name) {
                    Some(existing) => existing.append(incoming),
                    None => false,
                };
                if !matched {
                    return Err(FeatureError::PartitionMismatch { column: name });
                }
            }
        }
        Ok(merged)
    }

    /// Seconds elapsed since the previous record, as a global consecutive
    /// difference over the whole table. The first row has no previous
    /// record and gets NaN; duplicate timestamps yield 0.
    pub fn time_delta_seconds(&self) -> Vec<f64> {
        let mut deltas = Vec::with_capacity(self.points.len());
        for (i, point) in self.points.iter().enumerate() {
            if i == 0 {
                deltas.push(f64::NAN);
            } else {
                let dt = point.timestamp - self.points[i - 1].timestamp;
                deltas.push(dt.num_milliseconds() as f64 / 1000.0);
            }
        }
        deltas
    }
}

/// Name one column present in `a` but not `b` (or vice versa) for the
/// mismatch error message.
fn column_set_difference(a: &TrajectoryTable, b: &TrajectoryTable) -> String {
    for name in a.columns.keys() {
        if !b.columns.contains_key(name) {
            return name.clone();
        }
    }
    for name in b.columns.keys() {
        if !a.columns.contains_key(name) {
            return name.clone();
        }
    }
    String::new()
}
