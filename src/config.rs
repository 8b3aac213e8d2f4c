// SYNOID Kinematics - Pipeline Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One explicit structure handed to every stage: frame geometry for
// absolute coordinates, the joint-pair list, time base policy and the
// outlier model parameters.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "KINEMATICS_CONFIG";

/// Coordinate space of the emitted feature tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Coordinates exactly as extracted (image-relative x/y).
    Relative,
    /// x scaled by frame width, y by frame height, z flipped to `height - z`.
    Absolute,
}

impl CoordinateSpace {
    /// Suffix appended to output file stems.
    pub fn suffix(&self) -> &'static str {
        match self {
            CoordinateSpace::Relative => "rel",
            CoordinateSpace::Absolute => "abs",
        }
    }
}

/// Ordered pair of point names tracked as a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointPair {
    pub from: String,
    pub to: String,
}

impl JointPair {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Column name suffix, `{from}_{to}`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }
}

/// The joint pairs tracked by default.
pub fn default_joint_pairs() -> Vec<JointPair> {
    [
        ("right_shoulder", "right_elbow"),
        ("right_elbow", "right_wrist"),
        ("right_hip", "right_knee"),
        ("right_knee", "right_ankle"),
        ("right_ankle", "right_foot_index"),
        ("left_shoulder", "left_elbow"),
        ("left_elbow", "left_wrist"),
        ("left_hip", "left_knee"),
        ("left_knee", "left_ankle"),
        ("left_ankle", "left_foot_index"),
        ("forehead", "torso"),
    ]
    .iter()
    .map(|(a, b)| JointPair::new(a, b))
    .collect()
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    360
}

fn default_contamination() -> f64 {
    0.1
}

fn default_fps() -> f64 {
    30.0
}

fn default_space() -> CoordinateSpace {
    CoordinateSpace::Relative
}

fn default_estimators() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

fn default_decode_timeout() -> u64 {
    30
}

fn default_estimator_timeout() -> u64 {
    60
}

/// Configuration for every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frame width in pixels, used for absolute x.
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    /// Frame height in pixels, used for absolute y and z.
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_joint_pairs")]
    pub joint_pairs: Vec<JointPair>,
    /// Prior fraction of outlier rows given to the isolation forest.
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Forces the frame rate, ignoring any `fps` column.
    #[serde(default)]
    pub fps_override: Option<f64>,
    /// Frame rate used when neither an override nor an `fps` column exists.
    #[serde(default = "default_fps")]
    pub default_fps: f64,
    /// Keep one row per second instead of every frame.
    #[serde(default)]
    pub downsample: bool,
    /// Drop rows with undetected poses instead of failing augmentation.
    #[serde(default)]
    pub drop_undetected: bool,
    #[serde(default = "default_space")]
    pub coordinate_space: CoordinateSpace,
    /// Seed for the isolation forest. `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Columns left out of the outlier feature matrix.
    #[serde(default)]
    pub filter_exclude_columns: Vec<String>,
    /// Upper bound on the wait for a single decoded frame.
    #[serde(default = "default_decode_timeout")]
    pub decode_timeout_secs: u64,
    /// Upper bound on the wait for one estimator response.
    #[serde(default = "default_estimator_timeout")]
    pub estimator_timeout_secs: u64,
    /// Fan augmentation and filtering out across files.
    #[serde(default)]
    pub parallel: bool,
    /// Worker threads for parallel batches (defaults to the CPU count).
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            joint_pairs: default_joint_pairs(),
            contamination: default_contamination(),
            fps_override: None,
            default_fps: default_fps(),
            downsample: false,
            drop_undetected: false,
            coordinate_space: default_space(),
            seed: None,
            n_estimators: default_estimators(),
            max_samples: default_max_samples(),
            filter_exclude_columns: Vec::new(),
            decode_timeout_secs: default_decode_timeout(),
            estimator_timeout_secs: default_estimator_timeout(),
            parallel: false,
            workers: None,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Parsing config {}", path.display()))?;
        config.validate()?;
        info!("[CONFIG] Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Resolve the config from an explicit path, then `KINEMATICS_CONFIG`,
    /// then defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Self::load(env_path);
        }
        info!("[CONFIG] Using default pipeline config");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(PipelineError::Config(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.joint_pairs.is_empty() {
            return Err(PipelineError::Config("joint_pairs is empty".into()));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(PipelineError::Config(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if self.n_estimators == 0 || self.max_samples == 0 {
            return Err(PipelineError::Config(
                "n_estimators and max_samples must be positive".into(),
            ));
        }
        if let Some(fps) = self.fps_override {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(PipelineError::Config(format!(
                    "fps_override must be positive, got {fps}"
                )));
            }
        }
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(PipelineError::Config(format!(
                "default_fps must be positive, got {}",
                self.default_fps
            )));
        }
        if self.decode_timeout_secs == 0 || self.estimator_timeout_secs == 0 {
            return Err(PipelineError::Config("timeouts must be positive".into()));
        }
        if self.workers == Some(0) {
            return Err(PipelineError::Config("workers must be positive".into()));
        }
        Ok(())
    }

    /// Worker thread count for parallel batches.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.joint_pairs.len(), 11);
        assert_eq!(config.joint_pairs[10].key(), "forehead_torso");
        assert_eq!((config.frame_width, config.frame_height), (640, 360));
        assert!((config.contamination - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{"contamination": 0.2, "seed": 7, "coordinate_space": "absolute"}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!((config.contamination - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.coordinate_space, CoordinateSpace::Absolute);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.estimator_timeout_secs, 60);
        assert_eq!(config.joint_pairs.len(), 11);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.contamination = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.joint_pairs.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.fps_override = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.estimator_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join("synoid_kinematics_config_load");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.json");
        let json = r#"{"frame_width": 1280, "frame_height": 720, "downsample": true}"#;
        fs::write(&path, json).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.frame_width, 1280);
        assert!(config.downsample);

        fs::write(&path, r#"{"contamination": 0.9}"#).unwrap();
        assert!(PipelineConfig::load(&path).is_err());

        let _ = fs::remove_dir_all(dir);
    }
}
