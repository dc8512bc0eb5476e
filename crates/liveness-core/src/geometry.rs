//! Rectangle math used by the framing validator.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in camera preview coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    /// Build a rectangle, clamping negative extents to zero.
    pub fn new(min_x: f32, min_y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x,
            min_y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn max_x(&self) -> f32 {
        self.min_x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.min_y + self.height
    }

    /// Shrink by `total` on each axis, half taken from each side.
    ///
    /// An inset wider than the rectangle collapses it to a zero-sized box
    /// at its center rather than producing negative extents.
    pub fn inset(&self, total: f32) -> Rectangle {
        let dx = (total / 2.0).min(self.width / 2.0);
        let dy = (total / 2.0).min(self.height / 2.0);
        Rectangle {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            width: self.width - 2.0 * dx,
            height: self.height - 2.0 * dy,
        }
    }

    /// True if `inner` lies entirely within `self` on both axes.
    pub fn contains(&self, inner: &Rectangle) -> bool {
        contains(self, inner)
    }

    /// True if both width and height reach `size`.
    ///
    /// Requiring both sides keeps a wide-but-short box (tilted head) from
    /// counting as oversized.
    pub fn is_at_least(&self, size: f32) -> bool {
        self.width >= size && self.height >= size
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

/// Containment test: edges may touch, nothing may cross.
pub fn contains(outer: &Rectangle, inner: &Rectangle) -> bool {
    inner.min_x >= outer.min_x
        && inner.max_x() <= outer.max_x()
        && inner.min_y >= outer.min_y
        && inner.max_y() <= outer.max_y()
}
