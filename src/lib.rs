// SYNOID Kinematics Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Dance-video motion analysis: pose landmark extraction, kinematic feature
// augmentation and isolation-forest outlier filtering.

pub mod batch;
pub mod config;
pub mod error;
pub mod extraction;
pub mod kinematics;
pub mod outliers;
pub mod table;

pub use batch::{BatchFailure, BatchReport};
pub use config::{CoordinateSpace, JointPair, PipelineConfig};
pub use error::PipelineError;
pub use table::FrameTable;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
