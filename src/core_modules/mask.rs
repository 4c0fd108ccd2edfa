// THEORY:
// The `Mask` is the atomic unit of the whole engine. Everything the detector and
// the dataset hand us (binary detection masks, multi-valued ground-truth rasters)
// ends up as one or more `Mask`s before it is split, merged or matched.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: A `Mask` only knows its own shape and foreground
//     cells. It does not know how to label, merge or compare itself; those jobs
//     belong to the `raster_labeler` and `mask_merger` modules.
// 2.  **Flat Row-Major Storage**: Cells live in a single `Vec<bool>` indexed as
//     `y * width + x`, the same layout as `image` buffers.
// 3.  **Shape Invariant**: All masks that meet inside one image share identical
//     dimensions. Binary operations check this and fail loudly instead of
//     silently cropping.

use crate::error::{EvalError, Result};
use image::{GrayImage, Luma};

/// Integer class identifier shared by the detector, the dataset and the class
/// registry. Class 0 is reserved for background.
pub type ClassId = usize;

/// A 2-D boolean raster of fixed `width × height`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Mask {
    /// Creates an all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Wraps an existing row-major cell buffer.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<bool>) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if pixels.len() != expected {
            return Err(EvalError::LengthMismatch(format!(
                "mask buffer has {} cells, {}x{} needs {}",
                pixels.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a mask by evaluating `f(x, y)` for every cell.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Parses an ASCII sketch, one string per row, `#` marking foreground.
    /// Rows shorter than the widest one are padded with background.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        Self::from_fn(width, height, |x, y| {
            rows[y as usize].chars().nth(x as usize) == Some('#')
        })
    }

    /// Thresholds a raw raster: any non-zero value is foreground.
    pub fn from_luma(raw: &GrayImage) -> Self {
        let (width, height) = raw.dimensions();
        Self {
            width,
            height,
            pixels: raw.pixels().map(|p| p.0[0] != 0).collect(),
        }
    }

    /// Exports the mask as an 8-bit raster (255 = foreground) for overlay drawing.
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255u8]) } else { Luma([0u8]) }
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major cells.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Returns the cell at `(x, y)`; out-of-bounds reads are background.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[self.index(x, y)]
    }

    /// Sets the cell at `(x, y)`. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.pixels[i] = value;
        }
    }

    /// Marks every cell in `[y1, y2) × [x1, x2)` as foreground, clipped to the mask.
    pub fn fill_rect(&mut self, y1: u32, x1: u32, y2: u32, x2: u32) {
        for y in y1..y2.min(self.height) {
            for x in x1..x2.min(self.width) {
                self.set(x, y, true);
            }
        }
    }

    /// Number of foreground cells.
    pub fn area(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// True when the mask has no foreground at all.
    pub fn is_empty(&self) -> bool {
        !self.pixels.iter().any(|&p| p)
    }

    /// Fails with `DimensionMismatch` unless `other` has the same shape.
    pub fn check_same_dimensions(&self, other: &Mask) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(EvalError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        Ok(())
    }
}
