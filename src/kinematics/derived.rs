// SYNOID Kinematics - Derived Points
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Synthetic landmarks built from averages of detected ones:
//   forehead = mean(left_eye_outer, right_eye_outer)
//   torso    = mean(left_shoulder, right_shoulder, left_hip, right_hip)
// They must exist before joint-pair features, which use them as endpoints.

use crate::error::PipelineError;
use crate::kinematics::geometry::Point3;
use crate::kinematics::landmarks::axis_columns;
use crate::table::FrameTable;

pub const FOREHEAD: &str = "forehead";
pub const TORSO: &str = "torso";

const FOREHEAD_SOURCES: [&str; 2] = ["left_eye_outer", "right_eye_outer"];
const TORSO_SOURCES: [&str; 4] = ["left_shoulder", "right_shoulder", "left_hip", "right_hip"];

/// Columns that must be present and filled in every row.
pub fn required_columns() -> Vec<String> {
    FOREHEAD_SOURCES
        .iter()
        .chain(TORSO_SOURCES.iter())
        .flat_map(|p| axis_columns(p))
        .collect()
}

/// Borrow the x/y/z columns of a named point.
pub fn point_columns<'a>(
    table: &'a FrameTable,
    point: &str,
) -> Result<[&'a [f64]; 3], PipelineError> {
    let [x, y, z] = axis_columns(point);
    Ok([table.column(&x)?, table.column(&y)?, table.column(&z)?])
}

/// Point of a named landmark at one row, from borrowed columns.
pub fn point_at(cols: &[&[f64]; 3], row: usize) -> Point3 {
    Point3::new(cols[0][row], cols[1][row], cols[2][row])
}

/// Rows where any required source cell is missing (no pose detected).
pub fn undetected_rows(table: &FrameTable) -> Vec<usize> {
    let cols: Vec<&[f64]> = required_columns()
        .iter()
        .filter_map(|name| table.column(name).ok())
        .collect();
    (0..table.n_rows())
        .filter(|&row| cols.iter().any(|col| col[row].is_nan()))
        .collect()
}

/// Check that every required source column exists and has no missing cells.
pub fn validate_sources(table: &FrameTable) -> Result<(), PipelineError> {
    for name in required_columns() {
        let col = table.column(&name)?;
        if let Some(row) = col.iter().position(|v| v.is_nan()) {
            return Err(PipelineError::schema(
                name,
                row,
                "missing value (no pose detected); drop or impute undetected frames first",
            ));
        }
    }
    Ok(())
}

/// Append `forehead_{x,y,z}` and `torso_{x,y,z}` columns.
pub fn add_derived_points(table: &mut FrameTable) -> Result<(), PipelineError> {
    validate_sources(table)?;

    let derived = [
        (FOREHEAD, &FOREHEAD_SOURCES[..]),
        (TORSO, &TORSO_SOURCES[..]),
    ];
    for (name, sources) in derived {
        let cols = sources
            .iter()
            .map(|s| point_columns(table, s))
            .collect::<Result<Vec<_>, _>>()?;

        let points: Vec<Point3> = (0..table.n_rows())
            .map(|row| {
                let members: Vec<Point3> = cols.iter().map(|c| point_at(c, row)).collect();
                Point3::mean(&members)
            })
            .collect();

        let [cx, cy, cz] = axis_columns(name);
        table.set_column(&cx, points.iter().map(|p| p.x).collect())?;
        table.set_column(&cy, points.iter().map(|p| p.y).collect())?;
        table.set_column(&cz, points.iter().map(|p| p.z).collect())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_table(rows: usize) -> FrameTable {
        let mut table = FrameTable::new();
        let values = [
            ("left_eye_outer", [0.4, 0.2, -0.1]),
            ("right_eye_outer", [0.6, 0.2, -0.3]),
            ("left_shoulder", [0.3, 0.4, 0.0]),
            ("right_shoulder", [0.7, 0.4, 0.2]),
            ("left_hip", [0.35, 0.7, 0.1]),
            ("right_hip", [0.65, 0.7, 0.1]),
        ];
        for (point, xyz) in values {
            for (col, v) in axis_columns(point).into_iter().zip(xyz) {
                table.set_column(&col, vec![v; rows]).unwrap();
            }
        }
        table
    }

    #[test]
    fn test_forehead_and_torso() {
        let mut table = source_table(3);
        add_derived_points(&mut table).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert!((table.column("forehead_x").unwrap()[0] - 0.5).abs() < 1e-12);
        assert!((table.column("forehead_z").unwrap()[2] + 0.2).abs() < 1e-12);
        assert!((table.column("torso_x").unwrap()[1] - 0.5).abs() < 1e-12);
        assert!((table.column("torso_y").unwrap()[1] - 0.55).abs() < 1e-12);
        assert!((table.column("torso_z").unwrap()[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let mut table = source_table(2);
        let mut stripped = FrameTable::new();
        for name in table.columns().to_vec() {
            if name != "right_hip_z" {
                stripped.set_column(&name, table.column(&name).unwrap().to_vec()).unwrap();
            }
        }
        let err = add_derived_points(&mut stripped).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "right_hip_z"));

        // the untouched table still works
        assert!(add_derived_points(&mut table).is_ok());
    }

    #[test]
    fn test_null_landmark_row_is_schema_error() {
        let mut table = source_table(3);
        table.column_mut("left_shoulder_y").unwrap()[1] = f64::NAN;

        assert_eq!(undetected_rows(&table), vec![1]);
        match add_derived_points(&mut table) {
            Err(PipelineError::Schema { column, row, .. }) => {
                assert_eq!(column, "left_shoulder_y");
                assert_eq!(row, 1);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
