// SYNOID Kinematics - Landmark Vocabulary
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::error::PipelineError;
use crate::kinematics::geometry::Point3;
use crate::table::FrameTable;

/// Number of landmarks in a detected pose.
pub const LANDMARK_COUNT: usize = 33;

/// Landmark names in estimator output order.
pub const LANDMARK_NAMES: [&str; LANDMARK_COUNT] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

pub const FRAME_COLUMN: &str = "frame";
pub const FPS_COLUMN: &str = "fps";

/// Axis suffixes of a point's three columns.
pub const AXES: [&str; 3] = ["x", "y", "z"];

/// Column names `{point}_x`, `{point}_y`, `{point}_z`.
pub fn axis_columns(point: &str) -> [String; 3] {
    AXES.map(|axis| format!("{point}_{axis}"))
}

/// One detected pose: 33 points in `LANDMARK_NAMES` order.
pub type Pose = [Point3; LANDMARK_COUNT];

/// A single extracted frame. `pose` is `None` when no body was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    pub frame: usize,
    pub pose: Option<Pose>,
}

/// Lay frames out as a landmark table: `frame`, `fps`, then x/y/z per landmark.
/// Undetected frames keep their row with empty landmark cells.
pub fn frames_to_table(frames: &[LandmarkFrame], fps: f64) -> Result<FrameTable, PipelineError> {
    let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(2 + LANDMARK_COUNT * 3);
    columns.push((
        FRAME_COLUMN.to_string(),
        frames.iter().map(|f| f.frame as f64).collect(),
    ));
    columns.push((FPS_COLUMN.to_string(), vec![fps; frames.len()]));

    for (li, name) in LANDMARK_NAMES.iter().enumerate() {
        for (axis, col) in axis_columns(name).into_iter().enumerate() {
            let values = frames
                .iter()
                .map(|f| match &f.pose {
                    Some(pose) => pose[li].axis(axis),
                    None => f64::NAN,
                })
                .collect();
            columns.push((col, values));
        }
    }

    FrameTable::from_columns(columns)
}
