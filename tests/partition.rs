//! Tests for the partitioner

mod common;

use std::collections::HashSet;

use common::{random_walk, table};
use trackfeat::{partition_by_rows, partition_by_trajectory, TrajectoryTable};

#[test]
fn test_row_partition_round_trip() {
    let t = random_walk(7, 3, 20);
    for ceiling in [1, 2, 7, 59, 60, 1000] {
        let chunks = partition_by_rows(&t, ceiling);
        for chunk in &chunks {
            assert!(chunk.len() <= ceiling);
        }
        let merged = TrajectoryTable::concat(chunks).unwrap();
        assert_eq!(merged, t);
    }
}

#[test]
fn test_row_partition_round_trip_single_row() {
    let t = table(&[("a", 0, 10.0, 20.0)]);
    let merged = TrajectoryTable::concat(partition_by_rows(&t, 1)).unwrap();
    assert_eq!(merged, t);
}

#[test]
fn test_row_partition_round_trip_empty() {
    let t = TrajectoryTable::new();
    let chunks = partition_by_rows(&t, 10);
    let merged = TrajectoryTable::concat(chunks).unwrap();
    assert_eq!(merged, t);
}

#[test]
fn test_row_partition_chunk_count() {
    let t = random_walk(1, 1, 10);
    assert_eq!(partition_by_rows(&t, 3).len(), 4);
    assert_eq!(partition_by_rows(&t, 10).len(), 1);
    assert_eq!(partition_by_rows(&t, 100).len(), 1);
}

#[test]
fn test_row_partition_ignores_trajectory_boundaries() {
    let t = table(&[
        ("a", 0, 0.0, 0.0),
        ("a", 30, 0.0, 0.1),
        ("a", 60, 0.0, 0.2),
        ("b", 0, 1.0, 1.0),
    ]);
    // Ceiling 2 cuts mid-"a": the boundary is positional, not group-aware
    let chunks = partition_by_rows(&t, 2);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].trajectory_ids(), vec!["a".to_string()]);
    assert_eq!(
        chunks[1].trajectory_ids(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn test_group_partition_never_splits_a_trajectory() {
    let t = random_walk(42, 10, 12);
    for max_partitions in [1, 2, 3, 10, 50] {
        let partitions = partition_by_trajectory(&t, max_partitions);
        assert!(partitions.len() <= max_partitions);

        let mut seen: HashSet<String> = HashSet::new();
        let mut total_rows = 0;
        for partition in &partitions {
            total_rows += partition.len();
            for id in partition.trajectory_ids() {
                // Each trajectory id appears in exactly one partition
                assert!(seen.insert(id));
            }
        }
        assert_eq!(total_rows, t.len());
        assert_eq!(seen.len(), 10);
    }
}

#[test]
fn test_group_partition_keeps_row_order_within_trajectory() {
    let t = random_walk(3, 4, 8);
    let partitions = partition_by_trajectory(&t, 2);
    for partition in partitions {
        let mut last = std::collections::HashMap::new();
        for p in partition.points() {
            if let Some(prev) = last.get(&p.traj_id) {
                assert!(p.timestamp >= *prev);
            }
            last.insert(p.traj_id.clone(), p.timestamp);
        }
    }
}

#[test]
fn test_group_partition_empty_table() {
    let partitions = partition_by_trajectory(&TrajectoryTable::new(), 4);
    assert!(partitions.is_empty());
}
