// THEORY:
// The `RasterLabeler` is the lowest layer of the reconciliation engine. It turns a
// binary `Mask` into a grid of component labels, where every foreground cell
// carries the id of the connected region it belongs to.
//
// Algorithm:
// 1.  **Raster Scan Seeding**: Cells are visited in row-major order. The first
//     unlabeled foreground cell found becomes the seed of a new component, so the
//     component numbering is deterministic (ordered by each component's first cell).
// 2.  **Region Growing**: From each seed, a stack-based flood fill expands to the 4
//     direct neighbours (not diagonals) that are foreground and still unlabeled.
// 3.  **Value-Aware Variant**: `label_by_value` labels a multi-valued annotation
//     raster, where a component is a 4-connected run of one non-zero value.
// 4.  **Stateless Utility**: `label` is a pure function of its input; it keeps no
//     memory between calls.

use crate::core_modules::mask::Mask;
use image::GrayImage;

/// Result of labeling a mask. Background cells hold 0; components are `1..=count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeling {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    count: u32,
}

impl Labeling {
    /// Number of connected foreground components.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major label grid.
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.labels[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Binary mask holding exactly the cells of component `component`.
    pub fn component_mask(&self, component: u32) -> Mask {
        Mask::from_fn(self.width, self.height, |x, y| {
            component != 0 && self.label_at(x, y) == component
        })
    }

    /// First cell `(x, y)` of `component` in row-major order.
    pub fn first_pixel(&self, component: u32) -> Option<(u32, u32)> {
        if component == 0 {
            return None;
        }
        let width = self.width as usize;
        self.labels
            .iter()
            .position(|&l| l == component)
            .map(|i| ((i % width) as u32, (i / width) as u32))
    }
}

/// Labels the 4-connected foreground components of `mask`.
pub fn label(mask: &Mask) -> Labeling {
    let (width, height) = mask.dimensions();
    grow_components(width, height, |x, y| u8::from(mask.get(x, y)))
}

/// Labels a multi-valued raster. Value 0 is background; neighbouring cells join
/// the same component only when they carry the same value, so two touching
/// objects painted with different values stay apart.
pub fn label_by_value(raw: &GrayImage) -> Labeling {
    let (width, height) = raw.dimensions();
    grow_components(width, height, |x, y| raw.get_pixel(x, y).0[0])
}

fn grow_components(width: u32, height: u32, value: impl Fn(u32, u32) -> u8) -> Labeling {
    let mut labels = vec![0u32; (width as usize) * (height as usize)];
    let mut count = 0u32;
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let seed = (y as usize) * (width as usize) + x as usize;
            let seed_value = value(x, y);
            if seed_value == 0 || labels[seed] != 0 {
                continue;
            }

            // Grow a new component starting from this unlabeled seed.
            count += 1;
            labels[seed] = count;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in &[(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                    let nx = cx as i64 + dx;
                    let ny = cy as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    let ni = (ny as usize) * (width as usize) + nx as usize;
                    if labels[ni] == 0 && value(nx, ny) == seed_value {
                        labels[ni] = count;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }

    Labeling {
        width,
        height,
        labels,
        count,
    }
}

/// Shorthand for `label(mask).count()`.
pub fn component_count(mask: &Mask) -> u32 {
    label(mask).count()
}
