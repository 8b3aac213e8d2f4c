// SYNOID Kinematics - Feature Derivation Modules
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod augment;
pub mod coordinates;
pub mod derived;
pub mod downsample;
pub mod geometry;
pub mod joint_features;
pub mod landmarks;
