//! Axis-aligned bounding boxes
//!
//! Boxes use a top-left origin with y growing downward (screen space).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box centered on `center` with the given size
    #[inline]
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    /// Check that the box is usable as a spatial key: finite and non-degenerate
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
        {
            return Err(ValidationError::NonFinite {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            });
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ValidationError::NonPositiveSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Strict overlap: boxes that only share an edge do not intersect
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// True if `other` lies entirely inside this box (edges inclusive)
    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    /// Inclusive overlap: shared edges count
    #[inline]
    pub fn touches(&self, other: &BoundingBox) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    /// Four quadrants: top-right, top-left, bottom-left, bottom-right.
    ///
    /// The far quadrants are sized from the parent's edges so rounding never
    /// leaves a sliver of the parent uncovered.
    pub fn quadrants(&self) -> [BoundingBox; 4] {
        let (x, y) = (self.x, self.y);
        let mid_x = x + self.width / 2.0;
        let mid_y = y + self.height / 2.0;
        let (near_w, far_w) = (mid_x - x, self.right() - mid_x);
        let (near_h, far_h) = (mid_y - y, self.bottom() - mid_y);
        [
            BoundingBox::new(mid_x, y, far_w, near_h),
            BoundingBox::new(x, y, near_w, near_h),
            BoundingBox::new(x, mid_y, near_w, far_h),
            BoundingBox::new(mid_x, mid_y, far_w, far_h),
        ]
    }
}
