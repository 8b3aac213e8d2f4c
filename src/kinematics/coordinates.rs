// SYNOID Kinematics - Coordinate Space
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::config::{CoordinateSpace, PipelineConfig};
use crate::error::PipelineError;
use crate::table::FrameTable;

/// Convert every `_x`/`_y`/`_z` column into the requested space.
///
/// Absolute space scales x by the frame width and y by the frame height,
/// and flips depth to `height - z`. Relative space leaves the table as is.
pub fn apply_space(
    table: &mut FrameTable,
    space: CoordinateSpace,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    if space == CoordinateSpace::Relative {
        return Ok(());
    }

    let w = f64::from(config.frame_width);
    let h = f64::from(config.frame_height);
    for name in table.columns().to_vec() {
        let col = table.column_mut(&name)?;
        if name.ends_with("_x") {
            col.iter_mut().for_each(|v| *v *= w);
        } else if name.ends_with("_y") {
            col.iter_mut().for_each(|v| *v *= h);
        } else if name.ends_with("_z") {
            col.iter_mut().for_each(|v| *v = h - *v);
        }
    }
    Ok(())
}
