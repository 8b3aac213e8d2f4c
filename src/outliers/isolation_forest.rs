// SYNOID Kinematics - Isolation Forest
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Unsupervised anomaly scoring over a numeric feature matrix. Each tree
// isolates points with random axis-aligned splits; anomalies are isolated
// in fewer splits, so a short average path means a high score.
//
//   score(x) = 2 ^ (-E[h(x)] / c(psi))
//   c(n)     = 2 H(n-1) - 2 (n-1) / n,  H(i) = ln(i) + euler_gamma
//
// Rows whose score exceeds the (1 - contamination) quantile of the
// training scores are labelled outliers.

use crate::error::PipelineError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Parameters of the forest.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    /// Fixed seed for reproducible labels. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, x: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                value,
                left,
                right,
            } => {
                if x[*feature] < *value {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

struct TreeBuilder<'a> {
    matrix: &'a [Vec<f64>],
    max_depth: usize,
    rng: &'a mut StdRng,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> Node {
        if depth >= self.max_depth || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        // Only features that still vary inside this node can split it.
        let n_features = self.matrix[rows[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..n_features)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = self.matrix[r][f];
                    (lo.min(v), hi.max(v))
                });
                (lo < hi).then_some((f, lo, hi))
            })
            .collect();
        if candidates.is_empty() {
            return Node::Leaf { size: rows.len() };
        }

        let (feature, lo, hi) = candidates[self.rng.gen_range(0..candidates.len())];
        let value = self.rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| self.matrix[r][feature] < value);

        Node::Split {
            feature,
            value,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }
}

/// A fitted isolation forest with its decision threshold.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Fit on a row-major matrix. Every row must have the same width and
    /// every value must be finite.
    pub fn fit(matrix: &[Vec<f64>], params: &ForestParams) -> Result<Self, PipelineError> {
        validate_matrix(matrix)?;
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(PipelineError::ModelFit(format!(
                "contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }
        if params.n_estimators == 0 || params.max_samples == 0 {
            return Err(PipelineError::ModelFit(
                "n_estimators and max_samples must be positive".into(),
            ));
        }

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n = matrix.len();
        let sample_size = params.max_samples.min(n);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            let mut builder = TreeBuilder {
                matrix,
                max_depth,
                rng: &mut rng,
            };
            trees.push(builder.build(rows, 0));
        }

        let mut forest = Self {
            trees,
            sample_size,
            threshold: f64::INFINITY,
        };
        let scores = forest.score_samples(matrix);
        forest.threshold = quantile(&scores, 1.0 - params.contamination);
        debug!(
            "[FILTER] Fitted {} trees on {} rows (psi={}, threshold={:.4})",
            forest.trees.len(),
            n,
            sample_size,
            forest.threshold
        );
        Ok(forest)
    }

    /// Anomaly score per row in (0, 1]; higher is more anomalous.
    pub fn score_samples(&self, matrix: &[Vec<f64>]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        matrix
            .iter()
            .map(|x| {
                if norm == 0.0 {
                    return 0.5;
                }
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|t| t.path_length(x, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2f64.powf(-mean_depth / norm)
            })
            .collect()
    }

    /// `true` marks an outlier.
    pub fn predict(&self, matrix: &[Vec<f64>]) -> Vec<bool> {
        self.score_samples(matrix)
            .into_iter()
            .map(|s| s > self.threshold)
            .collect()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn validate_matrix(matrix: &[Vec<f64>]) -> Result<(), PipelineError> {
    let first = matrix
        .first()
        .ok_or_else(|| PipelineError::ModelFit("feature matrix has no rows".into()))?;
    if first.is_empty() {
        return Err(PipelineError::ModelFit("feature matrix has no columns".into()));
    }
    for (r, row) in matrix.iter().enumerate() {
        if row.len() != first.len() {
            return Err(PipelineError::ModelFit(format!(
                "row {r} has {} features, expected {}",
                row.len(),
                first.len()
            )));
        }
        if let Some(c) = row.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::ModelFit(format!(
                "non-finite value at row {r}, feature {c}"
            )));
        }
    }
    Ok(())
}

/// Linearly interpolated quantile, `q` in [0, 1].
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> ForestParams {
        ForestParams {
            seed: Some(seed),
            ..ForestParams::default()
        }
    }

    /// Smooth pseudo-random values in [0, 1) without an RNG.
    fn jitter(i: usize, k: usize) -> f64 {
        ((i * 37 + k * 101) % 97) as f64 / 97.0
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.05, "c(256) = {c256}");
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 5.0);
        assert_eq!(quantile(&v, 0.5), 3.0);
        assert!((quantile(&v, 0.9) - 4.6).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_rows_are_flagged() {
        let mut matrix: Vec<Vec<f64>> = (0..100)
            .map(|i| vec![jitter(i, 0), jitter(i, 1), jitter(i, 2)])
            .collect();
        let planted: Vec<usize> = (0..10).map(|k| k * 10 + 3).collect();
        for &r in &planted {
            matrix[r][1] = 1000.0 + r as f64;
        }

        let forest = IsolationForest::fit(&matrix, &seeded(42)).unwrap();
        let labels = forest.predict(&matrix);
        let flagged: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter_map(|(i, &o)| o.then_some(i))
            .collect();
        assert_eq!(flagged, planted);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let matrix: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![jitter(i, 0), jitter(i, 3)])
            .collect();
        let a = IsolationForest::fit(&matrix, &seeded(7)).unwrap().predict(&matrix);
        let b = IsolationForest::fit(&matrix, &seeded(7)).unwrap().predict(&matrix);
        assert_eq!(a, b);
    }

    #[test]
    fn test_retained_fraction_matches_contamination() {
        let mut rng = StdRng::seed_from_u64(3);
        let matrix: Vec<Vec<f64>> = (0..200)
            .map(|_| (0..4).map(|_| rng.gen::<f64>()).collect())
            .collect();
        let labels = IsolationForest::fit(&matrix, &seeded(11)).unwrap().predict(&matrix);
        let inliers = labels.iter().filter(|o| !**o).count();
        assert!(inliers <= 200);
        assert!((170..=190).contains(&inliers), "kept {inliers}");
    }

    #[test]
    fn test_degenerate_matrices_fail() {
        assert!(matches!(
            IsolationForest::fit(&[], &ForestParams::default()),
            Err(PipelineError::ModelFit(_))
        ));
        assert!(matches!(
            IsolationForest::fit(&[vec![]], &ForestParams::default()),
            Err(PipelineError::ModelFit(_))
        ));
        assert!(matches!(
            IsolationForest::fit(&[vec![1.0], vec![f64::NAN]], &ForestParams::default()),
            Err(PipelineError::ModelFit(_))
        ));
    }

    #[test]
    fn test_constant_matrix_keeps_everything() {
        let matrix = vec![vec![1.0, 2.0]; 20];
        let labels = IsolationForest::fit(&matrix, &seeded(1)).unwrap().predict(&matrix);
        assert!(labels.iter().all(|o| !o));
    }
}
