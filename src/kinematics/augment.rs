// SYNOID Kinematics - Feature Augmentation Stage
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Landmark table -> feature table. Order of operations per table:
//   1. optionally drop undetected frames
//   2. resolve the frame rate
//   3. convert to the requested coordinate space
//   4. derived points (forehead, torso)
//   5. joint-pair angles and distances
//   6. optionally downsample to one row per second
//   7. velocities on the final row spacing

use crate::config::{CoordinateSpace, PipelineConfig};
use crate::error::PipelineError;
use crate::kinematics::coordinates::apply_space;
use crate::kinematics::derived::{add_derived_points, undetected_rows};
use crate::kinematics::downsample::{downsample, resolve_fps, step_for};
use crate::kinematics::joint_features::{add_joint_features, add_velocities};
use crate::table::FrameTable;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one table during augmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_undetected: usize,
    pub fps: f64,
    /// Rows per second of the emitted table (the velocity scale).
    pub rows_per_second: f64,
}

/// Augment one landmark table in memory.
pub fn augment_table(
    mut table: FrameTable,
    space: CoordinateSpace,
    config: &PipelineConfig,
) -> Result<(FrameTable, AugmentStats), PipelineError> {
    let rows_in = table.n_rows();

    let mut dropped_undetected = 0;
    if config.drop_undetected {
        let undetected = undetected_rows(&table);
        if !undetected.is_empty() {
            dropped_undetected = undetected.len();
            let mut detected = vec![true; rows_in];
            for &r in &undetected {
                detected[r] = false;
            }
            let keep: Vec<usize> = (0..rows_in).filter(|&r| detected[r]).collect();
            table = table.select_rows(&keep);
        }
    }

    let fps = resolve_fps(&table, config)?;

    apply_space(&mut table, space, config)?;
    add_derived_points(&mut table)?;
    add_joint_features(&mut table, &config.joint_pairs)?;

    let mut rows_per_second = fps;
    if config.downsample {
        let step = step_for(fps);
        table = downsample(&table, step);
        rows_per_second = fps / step as f64;
    }
    add_velocities(&mut table, &config.joint_pairs, rows_per_second)?;

    let stats = AugmentStats {
        rows_in,
        rows_out: table.n_rows(),
        dropped_undetected,
        fps,
        rows_per_second,
    };
    Ok((table, stats))
}

/// True for files this stage wrote itself (`*_rel.csv`, `*_abs.csv`).
pub fn is_augmented_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with("_rel.csv") || n.ends_with("_abs.csv"))
        .unwrap_or(false)
}

/// Output path `{output_dir}/{stem}_{rel|abs}.csv`.
pub fn output_path(input: &Path, output_dir: &Path, space: CoordinateSpace) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "landmarks".to_string());
    output_dir.join(format!("{stem}_{}.csv", space.suffix()))
}

/// Augment one landmark file into one output per requested space.
pub fn augment_file(
    input: &Path,
    output_dir: &Path,
    spaces: &[CoordinateSpace],
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let table = FrameTable::read_csv(input)?;
    let mut written = Vec::with_capacity(spaces.len());

    for &space in spaces {
        let (augmented, stats) = augment_table(table.clone(), space, config)
            .with_context(|| format!("Augmenting {}", input.display()))?;
        if stats.dropped_undetected > 0 {
            warn!(
                "[AUGMENT] Dropped {} undetected frame(s) from {:?}",
                stats.dropped_undetected, input
            );
        }

        let out = output_path(input, output_dir, space);
        augmented.write_csv(&out)?;
        info!(
            "[AUGMENT] {:?} -> {:?} ({} -> {} rows @ {:.2} rows/s)",
            input, out, stats.rows_in, stats.rows_out, stats.rows_per_second
        );
        written.push(out);
    }
    Ok(written)
}
