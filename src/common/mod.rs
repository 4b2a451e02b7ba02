//! Common utilities and types for the Vulcan scheduling core

/// Common types used across the codebase
pub mod types {
    use nalgebra::Vector3;

    /// A point in machine coordinates (x, y, z)
    pub type Point3 = Vector3<f64>;

    /// A velocity in machine coordinates
    pub type Velocity3 = Vector3<f64>;
}

use types::{Point3, Velocity3};

/// Kinematic state of the tool reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolState {
    pub position: Point3,
    pub velocity: Velocity3,
}

impl ToolState {
    /// Create a state at rest at the given position
    pub fn at_rest(position: Point3) -> Self {
        ToolState {
            position,
            velocity: Velocity3::zeros(),
        }
    }
}

/// Euclidean distance between two points
pub fn distance_between_points(a: &Point3, b: &Point3) -> f64 {
    (b - a).norm()
}
