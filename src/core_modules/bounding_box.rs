//! Tight bounding boxes around mask foreground and their overlap ratio.

use crate::core_modules::mask::Mask;

/// Axis-aligned box in pixel coordinates. `y1`/`x1` are the first foreground
/// row/column, `y2`/`x2` are one past the last, so `area = (y2-y1)*(x2-x1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub y1: u32,
    pub x1: u32,
    pub y2: u32,
    pub x2: u32,
}

impl BoundingBox {
    pub fn new(y1: u32, x1: u32, y2: u32, x2: u32) -> Self {
        Self { y1, x1, y2, x2 }
    }

    /// Tight crop around the foreground of `mask`.
    /// Returns `None` for a mask without foreground, whose box would be degenerate.
    pub fn from_mask(mask: &Mask) -> Option<Self> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut found = false;

        for y in 0..mask.height() {
            for x in 0..mask.width() {
                if mask.get(x, y) {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        found.then(|| Self::new(min_y, min_x, max_y + 1, max_x + 1))
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> f64 {
        self.width() as f64 * self.height() as f64
    }

    /// Intersection over union. Zero when the boxes are disjoint or either
    /// has zero area.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let area_a = self.area();
        let area_b = other.area();
        if area_a <= 0.0 || area_b <= 0.0 {
            return 0.0;
        }

        let y_top = self.y1.max(other.y1);
        let x_left = self.x1.max(other.x1);
        let y_bottom = self.y2.min(other.y2);
        let x_right = self.x2.min(other.x2);
        if x_right <= x_left || y_bottom <= y_top {
            return 0.0;
        }

        let intersection = (x_right - x_left) as f64 * (y_bottom - y_top) as f64;
        let union = area_a + area_b - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}
