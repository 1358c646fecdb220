//! Normalized frame geometry.
//!
//! All coordinates are relative to the frame (0.0 to 1.0) so zones survive
//! resolution changes and sub-stream/main-stream switches.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A normalized point within a frame (0.0 = top-left, 1.0 = bottom-right).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that both coordinates are within 0.0-1.0.
    pub fn is_valid(&self) -> bool {
        // Allow small epsilon for float precision
        (-0.001..=1.001).contains(&self.x) && (-0.001..=1.001).contains(&self.y)
    }
}

impl From<(f64, f64)> for NormalizedPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A normalized bounding box representing a relative region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedBBox {
    /// X coordinate of the top-left corner (0.0 = left, 1.0 = right)
    pub x: f64,
    /// Y coordinate of the top-left corner (0.0 = top, 1.0 = bottom)
    pub y: f64,
    /// Width of the box (0.0 to 1.0)
    pub width: f64,
    /// Height of the box (0.0 to 1.0)
    pub height: f64,
}

impl NormalizedBBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the box is valid (within 0.0-1.0 range, positive area).
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001
            && self.y + self.height <= 1.001
    }

    /// Center point of the box; the anchor used for zone evaluation.
    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Where motion was detected: a point or a detection bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MotionLocation {
    Point(NormalizedPoint),
    BBox(NormalizedBBox),
}

impl MotionLocation {
    /// The point a zone test is anchored at.
    pub fn anchor(&self) -> NormalizedPoint {
        match self {
            MotionLocation::Point(p) => *p,
            MotionLocation::BBox(b) => b.center(),
        }
    }
}

impl From<NormalizedPoint> for MotionLocation {
    fn from(p: NormalizedPoint) -> Self {
        MotionLocation::Point(p)
    }
}

impl From<NormalizedBBox> for MotionLocation {
    fn from(b: NormalizedBBox) -> Self {
        MotionLocation::BBox(b)
    }
}
