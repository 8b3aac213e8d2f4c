// SYNOID Kinematics - Outlier Filter Stage
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Feature table -> filtered table. Fits an isolation forest over every
// feature column of one table and keeps only inlier rows, labelled with an
// `is_outlier` column.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::outliers::isolation_forest::{ForestParams, IsolationForest};
use crate::table::FrameTable;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub const OUTLIER_COLUMN: &str = "is_outlier";

/// Row counts of one filtering run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub features: usize,
}

impl FilterStats {
    pub fn removed(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

impl From<&PipelineConfig> for ForestParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        }
    }
}

/// Names of the columns fed to the model.
pub fn feature_columns(table: &FrameTable, config: &PipelineConfig) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.as_str() != OUTLIER_COLUMN && !config.filter_exclude_columns.contains(c))
        .cloned()
        .collect()
}

/// Row-major feature matrix. Non-finite cells are a model-fit error naming
/// the column, since the model cannot place them.
fn feature_matrix(table: &FrameTable, features: &[String]) -> Result<Vec<Vec<f64>>, PipelineError> {
    let cols = features
        .iter()
        .map(|f| table.column(f))
        .collect::<Result<Vec<_>, _>>()?;
    for (name, col) in features.iter().zip(&cols) {
        if let Some(row) = col.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::ModelFit(format!(
                "column '{name}' has a missing or non-finite value at row {row}"
            )));
        }
    }
    Ok((0..table.n_rows())
        .map(|r| cols.iter().map(|c| c[r]).collect())
        .collect())
}

/// Keep the inlier rows of one table.
pub fn filter_table(
    table: &FrameTable,
    config: &PipelineConfig,
) -> Result<(FrameTable, FilterStats), PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::ModelFit("table has no rows".into()));
    }
    let features = feature_columns(table, config);
    if features.is_empty() {
        return Err(PipelineError::ModelFit("table has no feature columns".into()));
    }

    let matrix = feature_matrix(table, &features)?;
    let forest = IsolationForest::fit(&matrix, &ForestParams::from(config))?;
    let labels = forest.predict(&matrix);

    let inliers: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, &outlier)| (!outlier).then_some(i))
        .collect();

    let mut filtered = table.select_rows(&inliers);
    filtered.set_column(OUTLIER_COLUMN, vec![0.0; inliers.len()])?;

    let stats = FilterStats {
        rows_in: table.n_rows(),
        rows_out: filtered.n_rows(),
        features: features.len(),
    };
    Ok((filtered, stats))
}

/// Filter one feature file into `output`.
pub fn filter_file(input: &Path, output: &Path, config: &PipelineConfig) -> Result<FilterStats> {
    let table = FrameTable::read_csv(input)?;
    let (filtered, stats) =
        filter_table(&table, config).with_context(|| format!("Filtering {}", input.display()))?;
    filtered.write_csv(output)?;
    info!(
        "[FILTER] Processed {:?} and saved results to {:?} (kept {}/{}, removed {})",
        input,
        output,
        stats.rows_out,
        stats.rows_in,
        stats.removed()
    );
    Ok(stats)
}
