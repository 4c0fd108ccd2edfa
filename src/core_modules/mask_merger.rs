// THEORY:
// The `mask_merger` answers the two questions the grouping layer keeps asking
// about a pair of masks: "what is their union?" and "are they one object?".
//
// The touching test is defined purely in terms of component counts: label each
// mask on its own, label their union, and compare. If the union has fewer
// components than the two masks had separately, at least two previously separate
// regions became connected (or one absorbed another), so the masks touch. This
// handles shared borders and overlaps with a single rule and is the only
// connectivity test used anywhere in the engine.

use crate::core_modules::mask::Mask;
use crate::core_modules::raster_labeler::component_count;
use crate::error::Result;

pub mod mask_merger {
    use super::*;

    /// Elementwise OR of two same-shaped masks.
    pub fn union(a: &Mask, b: &Mask) -> Result<Mask> {
        a.check_same_dimensions(b)?;
        let pixels = a
            .pixels()
            .iter()
            .zip(b.pixels())
            .map(|(&p, &q)| p || q)
            .collect();
        Mask::from_pixels(a.width(), a.height(), pixels)
    }

    /// True when merging `a` and `b` strictly reduces the component count.
    pub fn touching(a: &Mask, b: &Mask) -> Result<bool> {
        touching_with_counts(a, component_count(a), b, component_count(b))
    }

    /// Same as [`touching`] with the individual component counts already known.
    /// The grouping layer labels each region once and reuses the counts for
    /// every pair it tests.
    pub fn touching_with_counts(a: &Mask, count_a: u32, b: &Mask, count_b: u32) -> Result<bool> {
        let merged = union(a, b)?;
        Ok(component_count(&merged) < count_a + count_b)
    }
}
