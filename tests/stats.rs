//! Tests for the statistics aggregator

mod common;

use common::{approx_eq, table};
use trackfeat::{
    columns, generate_kinematic_stats, pivot_stats_df, segment_traj_by_week, FeatureColumn,
    FeatureConfig, FeatureError, Statistic, StatsTable, TrajectoryTable,
};

fn config() -> FeatureConfig {
    FeatureConfig::default()
}

/// Two equator trajectories with a label column, one hour between fixes.
fn labeled_table() -> TrajectoryTable {
    let mut t = table(&[
        ("a", 0, 0.0, 0.0),
        ("a", 3600, 0.0, 1.0),
        ("a", 7200, 0.0, 2.0),
        ("b", 0, 10.0, 10.0),
        ("b", 3600, 10.0, 10.0),
    ]);
    t.insert_column(
        "species",
        FeatureColumn::Label(vec![
            "gull".to_string(),
            "gull".to_string(),
            "gull".to_string(),
            "tern".to_string(),
            "tern".to_string(),
        ]),
    )
    .unwrap();
    t
}

fn stat_value(stats: &StatsTable, group: &str, feature: &str, statistic: Statistic) -> f64 {
    stats
        .rows
        .iter()
        .find(|r| r.group_id == group && r.feature == feature && r.statistic == statistic)
        .map(|r| r.value)
        .unwrap_or_else(|| panic!("no stat row for {group}/{feature}/{statistic:?}"))
}

#[test]
fn test_stats_battery_values() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();

    // Trajectory "a" consecutive distances: [0, 111.19, 111.19]
    let d = 111.1949;
    let feature = columns::DISTANCE_PREV_TO_CURR;
    assert_eq!(stat_value(&stats, "a", feature, Statistic::Count), 3.0);
    assert!(approx_eq(
        stat_value(&stats, "a", feature, Statistic::Mean),
        2.0 * d / 3.0,
        0.01
    ));
    assert_eq!(stat_value(&stats, "a", feature, Statistic::Min), 0.0);
    assert!(approx_eq(
        stat_value(&stats, "a", feature, Statistic::Max),
        d,
        0.01
    ));
    assert!(approx_eq(
        stat_value(&stats, "a", feature, Statistic::Median),
        d,
        0.01
    ));
    // Sample std of {0, d, d} is d / sqrt(3)
    assert!(approx_eq(
        stat_value(&stats, "a", feature, Statistic::Std),
        d / 3.0_f64.sqrt(),
        0.01
    ));

    // Trajectory "b" never moves
    assert_eq!(
        stat_value(&stats, "b", columns::DISTANCE_FROM_START, Statistic::Max),
        0.0
    );
}

#[test]
fn test_stats_exclude_nan_from_reductions() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();

    // Speed row 0 is NaN (no previous record): excluded, count drops to 2
    let count = stat_value(&stats, "a", columns::SPEED_PREV_TO_CURR, Statistic::Count);
    assert_eq!(count, 2.0);
    let mean = stat_value(&stats, "a", columns::SPEED_PREV_TO_CURR, Statistic::Mean);
    assert!(mean.is_finite());
}

#[test]
fn test_stats_carry_target_through() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();
    for row in &stats.rows {
        match row.group_id.as_str() {
            "a" => assert_eq!(row.target, "gull"),
            "b" => assert_eq!(row.target, "tern"),
            other => panic!("unexpected group {other}"),
        }
    }
}

#[test]
fn test_stats_missing_target_column() {
    let t = table(&[("a", 0, 0.0, 0.0), ("a", 30, 0.0, 0.1)]);
    assert!(matches!(
        generate_kinematic_stats(&t, "species", false, &config()),
        Err(FeatureError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_segment_traj_by_week() {
    let week = 7 * 86_400;
    let mut t = table(&[
        ("a", 0, 0.0, 0.0),          // 1970-01-01, ISO week 1970-W01
        ("a", 86_400, 0.0, 0.1),     // still W01
        ("a", week, 0.0, 0.2),       // 1970-01-08, W02
        ("b", week + 60, 5.0, 5.0),  // W02 of a different trajectory
    ]);
    t.insert_column(
        "species",
        FeatureColumn::Label(vec!["g".into(), "g".into(), "g".into(), "t".into()]),
    )
    .unwrap();

    let segmented = segment_traj_by_week(&t, &config()).unwrap();
    let seg = segmented.label_column(columns::SEGMENT_ID).unwrap();
    assert_eq!(seg[0], "a#1970-W01");
    assert_eq!(seg[0], seg[1]); // same trajectory, same week
    assert_eq!(seg[2], "a#1970-W02");
    assert_eq!(seg[3], "b#1970-W02"); // same week, different trajectory
}

#[test]
fn test_stats_by_segment_groups_per_week() {
    let week = 7 * 86_400;
    let mut t = table(&[
        ("a", 0, 0.0, 0.0),
        ("a", 3600, 0.0, 1.0),
        ("a", week, 0.0, 1.0),
        ("a", week + 3600, 0.0, 2.0),
    ]);
    t.insert_column(
        "species",
        FeatureColumn::Label(vec!["g".into(); 4]),
    )
    .unwrap();

    // seg_id is absent: computed on the fly, same recovery convention as
    // the feature chain
    let stats = generate_kinematic_stats(&t, "species", true, &config()).unwrap();
    let groups: std::collections::BTreeSet<&str> =
        stats.rows.iter().map(|r| r.group_id.as_str()).collect();
    assert_eq!(
        groups.into_iter().collect::<Vec<_>>(),
        vec!["a#1970-W01", "a#1970-W02"]
    );
}

#[test]
fn test_pivot_canonical_column_order() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();
    let pivoted = pivot_stats_df(&stats, "species");

    // Feature-major, statistic-minor, target last
    let mut expected: Vec<String> = Vec::new();
    for feature in columns::ORDERED_FEATURES {
        for statistic in Statistic::BATTERY {
            expected.push(format!("{}_{}", feature, statistic.label()));
        }
    }
    expected.push("species".to_string());
    assert_eq!(pivoted.columns, expected);

    assert_eq!(pivoted.rows.len(), 2);
    assert_eq!(pivoted.rows[0].group_id, "a");
    assert_eq!(pivoted.rows[0].values.len(), pivoted.columns.len() - 1);
    assert_eq!(pivoted.rows[0].target, "gull");
    assert_eq!(pivoted.rows[1].target, "tern");
}

#[test]
fn test_pivot_column_order_is_stable() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();

    // Row insertion order must not influence the pivoted column order
    let mut shuffled = stats.clone();
    shuffled.rows.reverse();

    let first = pivot_stats_df(&stats, "species");
    let second = pivot_stats_df(&shuffled, "species");
    assert_eq!(first.columns, second.columns);

    // Pivoting the same battery twice always yields the same order
    let again = pivot_stats_df(&stats, "species");
    assert_eq!(first.columns, again.columns);
}

#[test]
fn test_pivot_values_match_long_rows() {
    let stats = generate_kinematic_stats(&labeled_table(), "species", false, &config()).unwrap();
    let pivoted = pivot_stats_df(&stats, "species");

    let col = format!("{}_mean", columns::DISTANCE_PREV_TO_CURR);
    let idx = pivoted.columns.iter().position(|c| *c == col).unwrap();
    let wide = pivoted.rows[0].values[idx];
    let long = stat_value(
        &stats,
        "a",
        columns::DISTANCE_PREV_TO_CURR,
        Statistic::Mean,
    );
    assert_eq!(wide, long);
}
