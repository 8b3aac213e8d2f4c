// SYNOID Kinematics - Joint-Pair Features
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// For every ordered pair of named points, three series per frame:
//   a_{p1}_{p2}  angle between the two position vectors (degrees)
//   d_{p1}_{p2}  Euclidean distance between the points
//   v_{p1}_{p2}  first difference of distance, scaled to units per second
// Pairs are independent of each other; only velocity depends on the
// previous row.

use crate::config::JointPair;
use crate::error::PipelineError;
use crate::kinematics::derived::{point_at, point_columns};
use crate::kinematics::geometry::{angle_between, distance};
use crate::table::FrameTable;

pub fn angle_column(pair: &JointPair) -> String {
    format!("a_{}", pair.key())
}

pub fn distance_column(pair: &JointPair) -> String {
    format!("d_{}", pair.key())
}

pub fn velocity_column(pair: &JointPair) -> String {
    format!("v_{}", pair.key())
}

/// Append angle and distance columns for each pair.
pub fn add_joint_features(
    table: &mut FrameTable,
    pairs: &[JointPair],
) -> Result<(), PipelineError> {
    for pair in pairs {
        let from = point_columns(table, &pair.from)?;
        let to = point_columns(table, &pair.to)?;

        let (angles, distances): (Vec<f64>, Vec<f64>) = (0..table.n_rows())
            .map(|row| {
                let a = point_at(&from, row);
                let b = point_at(&to, row);
                (angle_between(&a, &b), distance(&a, &b))
            })
            .unzip();

        table.set_column(&angle_column(pair), angles)?;
        table.set_column(&distance_column(pair), distances)?;
    }
    Ok(())
}

/// Velocity series from consecutive distances. Row 0 is 0 by definition:
/// there is no prior sample, which reads the same as no relative motion.
pub fn velocity_series(distances: &[f64], rows_per_second: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(distances.len());
    if distances.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(
        distances
            .windows(2)
            .map(|w| (w[1] - w[0]) * rows_per_second),
    );
    out
}

/// Append (or recompute) velocity columns from the distance columns.
pub fn add_velocities(
    table: &mut FrameTable,
    pairs: &[JointPair],
    rows_per_second: f64,
) -> Result<(), PipelineError> {
    for pair in pairs {
        let velocities = velocity_series(table.column(&distance_column(pair))?, rows_per_second);
        table.set_column(&velocity_column(pair), velocities)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::landmarks::axis_columns;

    fn two_point_table(a: &[[f64; 3]], b: &[[f64; 3]]) -> FrameTable {
        let mut table = FrameTable::new();
        for (point, rows) in [("right_hip", a), ("right_knee", b)] {
            for (axis, col) in axis_columns(point).into_iter().enumerate() {
                table.set_column(&col, rows.iter().map(|r| r[axis]).collect()).unwrap();
            }
        }
        table
    }

    fn hip_knee() -> Vec<JointPair> {
        vec![JointPair::new("right_hip", "right_knee")]
    }

    #[test]
    fn test_static_pose_has_constant_features() {
        let hip = [[0.4, 0.6, 0.1]; 3];
        let knee = [[0.42, 0.8, 0.05]; 3];
        let mut table = two_point_table(&hip, &knee);
        let pairs = hip_knee();

        add_joint_features(&mut table, &pairs).unwrap();
        add_velocities(&mut table, &pairs, 30.0).unwrap();

        let a = table.column("a_right_hip_right_knee").unwrap();
        let d = table.column("d_right_hip_right_knee").unwrap();
        assert!(a.iter().all(|v| *v == a[0]));
        assert!(d.iter().all(|v| *v == d[0]));
        assert_eq!(table.column("v_right_hip_right_knee").unwrap(), &[0.0, 0.0, 0.0]);
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_origin_point_gives_nan_angle_but_finite_distance() {
        let hip = [[0.0, 0.0, 0.0], [0.3, 0.1, 0.0]];
        let knee = [[0.5, 0.5, 0.0], [0.5, 0.5, 0.0]];
        let mut table = two_point_table(&hip, &knee);
        add_joint_features(&mut table, &hip_knee()).unwrap();

        let a = table.column("a_right_hip_right_knee").unwrap();
        let d = table.column("d_right_hip_right_knee").unwrap();
        assert!(a[0].is_nan());
        assert!(a[1].is_finite() && (0.0..=180.0).contains(&a[1]));
        assert!(d[0].is_finite());
        assert!((d[0] - 0.5_f64.hypot(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_coincident_endpoints_give_zero_angle() {
        let hip = [[0.1, 0.2, 0.3], [0.3, 0.4, 0.0], [0.4, 0.6, 0.1]];
        let knee = [[0.1, 0.2, 0.3], [0.6, 0.8, 0.0], [0.42, 0.8, 0.05]];
        let mut table = two_point_table(&hip, &knee);
        add_joint_features(&mut table, &hip_knee()).unwrap();

        let a = table.column("a_right_hip_right_knee").unwrap();
        assert_eq!(a[0], 0.0);
        assert_eq!(a[1], 0.0);
        assert!(a.iter().all(|v| v.is_finite()));
        assert_eq!(table.column("d_right_hip_right_knee").unwrap()[0], 0.0);
    }

    #[test]
    fn test_velocity_series() {
        let v = velocity_series(&[1.0, 1.5, 1.25, 1.25], 10.0);
        assert_eq!(v, vec![0.0, 5.0, -2.5, 0.0]);
        assert!(velocity_series(&[], 30.0).is_empty());
        assert_eq!(velocity_series(&[3.0], 30.0), vec![0.0]);
    }

    #[test]
    fn test_missing_endpoint_is_schema_error() {
        let mut table = two_point_table(&[[0.1, 0.1, 0.1]], &[[0.2, 0.2, 0.2]]);
        let pairs = vec![JointPair::new("right_hip", "right_ankle")];
        assert!(matches!(
            add_joint_features(&mut table, &pairs),
            Err(PipelineError::MissingColumn(_))
        ));
    }
}
