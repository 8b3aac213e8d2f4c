// SYNOID Kinematics - Outlier Filtering
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod filter;
pub mod isolation_forest;
