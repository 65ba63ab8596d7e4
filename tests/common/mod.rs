//! Shared test support: hand-built tables and seeded synthetic trajectories.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trackfeat::{TrajectoryPoint, TrajectoryTable};

/// Timestamp helper: seconds since the epoch, UTC.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Build a table from (traj_id, epoch seconds, lat, lon) rows.
pub fn table(rows: &[(&str, i64, f64, f64)]) -> TrajectoryTable {
    let points = rows
        .iter()
        .map(|&(id, t, lat, lon)| TrajectoryPoint::new(id, ts(t), lat, lon))
        .collect();
    TrajectoryTable::from_points(points).unwrap()
}

/// Seeded random-walk dataset: `traj_count` trajectories of
/// `points_per_traj` records each, sampled every 30 seconds.
pub fn random_walk(seed: u64, traj_count: usize, points_per_traj: usize) -> TrajectoryTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    for t in 0..traj_count {
        let id = format!("traj-{t}");
        let mut lat: f64 = rng.gen_range(-60.0..60.0);
        let mut lon: f64 = rng.gen_range(-170.0..170.0);
        for i in 0..points_per_traj {
            points.push(TrajectoryPoint::new(
                id.clone(),
                ts(i as i64 * 30),
                lat,
                lon,
            ));
            lat += rng.gen_range(-0.001..0.001);
            lon += rng.gen_range(-0.001..0.001);
        }
    }
    TrajectoryTable::from_points(points).unwrap()
}

pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}
