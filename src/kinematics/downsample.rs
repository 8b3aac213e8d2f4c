// SYNOID Kinematics - Temporal Downsampler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Keeps roughly one row per second: rows 0, step, 2*step, ... with
// step = round(fps). The `frame` column, when present, keeps the original
// frame index; row positions are contiguous again after selection.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::kinematics::landmarks::FPS_COLUMN;
use crate::table::FrameTable;

/// Resolve the frame rate for a table: config override, then the `fps`
/// column at row 0, then the configured default.
pub fn resolve_fps(table: &FrameTable, config: &PipelineConfig) -> Result<f64, PipelineError> {
    let fps = match config.fps_override {
        Some(fps) => fps,
        None => match table.column(FPS_COLUMN) {
            Ok(col) if !col.is_empty() => col[0],
            _ => config.default_fps,
        },
    };
    if fps.is_finite() && fps > 0.0 {
        Ok(fps)
    } else {
        Err(PipelineError::schema(FPS_COLUMN, 0, format!("invalid frame rate {fps}")))
    }
}

/// Row stride for a frame rate, never below 1.
pub fn step_for(fps: f64) -> usize {
    (fps.round() as usize).max(1)
}

/// Keep every `step`-th row, starting at row 0.
pub fn downsample(table: &FrameTable, step: usize) -> FrameTable {
    let step = step.max(1);
    let rows: Vec<usize> = (0..table.n_rows()).step_by(step).collect();
    table.select_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(rows: usize, fps: Option<f64>) -> FrameTable {
        let mut table = FrameTable::new();
        table
            .set_column("frame", (0..rows).map(|i| i as f64).collect())
            .unwrap();
        if let Some(fps) = fps {
            table.set_column(FPS_COLUMN, vec![fps; rows]).unwrap();
        }
        table
    }

    #[test]
    fn test_ninety_rows_at_thirty_fps() {
        let table = indexed(90, Some(30.0));
        let fps = resolve_fps(&table, &PipelineConfig::default()).unwrap();
        let out = downsample(&table, step_for(fps));
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.column("frame").unwrap(), &[0.0, 30.0, 60.0]);
    }

    #[test]
    fn test_row_count_is_ceiling() {
        for (rows, step) in [(91, 30), (1, 30), (29, 30), (60, 30), (7, 1), (0, 5)] {
            let out = downsample(&indexed(rows, None), step);
            assert_eq!(out.n_rows(), rows.div_ceil(step), "rows={rows} step={step}");
        }
    }

    #[test]
    fn test_fps_resolution_order() {
        let table = indexed(4, Some(25.0));
        let mut config = PipelineConfig::default();
        assert_eq!(resolve_fps(&table, &config).unwrap(), 25.0);

        config.fps_override = Some(60.0);
        assert_eq!(resolve_fps(&table, &config).unwrap(), 60.0);

        let bare = indexed(4, None);
        assert_eq!(resolve_fps(&bare, &PipelineConfig::default()).unwrap(), 30.0);

        let broken = indexed(4, Some(0.0));
        assert!(resolve_fps(&broken, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn test_fractional_fps_rounds() {
        assert_eq!(step_for(29.97), 30);
        assert_eq!(step_for(0.2), 1);
    }
}
