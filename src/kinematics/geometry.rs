// SYNOID Kinematics - Vector Geometry
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Per-frame vector math shared by the derived-point and joint-pair
// calculators.

use serde::{Deserialize, Serialize};

/// A 3D position (x, y, z).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component by axis index (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn dot(&self, other: &Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn sub(&self, other: &Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Arithmetic mean of the given points.
    pub fn mean(points: &[Point3]) -> Point3 {
        let n = points.len() as f64;
        let sum = points.iter().fold(Point3::default(), |acc, p| {
            Point3::new(acc.x + p.x, acc.y + p.y, acc.z + p.z)
        });
        Point3::new(sum.x / n, sum.y / n, sum.z / n)
    }
}

/// Angle in degrees between two position vectors measured from the origin.
///
/// `cos(θ) = (a · b) / (|a| × |b|)`, clamped to [-1, 1] so parallel vectors
/// give exactly 0° or 180°. A zero-length vector gives NaN (clamp keeps NaN).
pub fn angle_between(a: &Point3, b: &Point3) -> f64 {
    let cos_angle = (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Euclidean distance between two points.
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    a.sub(b).norm()
}
