use crate::region::Region;
use crate::traits::MergeCost;

/// Test double: every pair costs the same.
#[derive(Debug, Clone, Copy)]
pub struct ConstantCost(pub f64);

impl MergeCost for ConstantCost {
    fn cost(&self, _a: &Region, _b: &Region, _shared_boundary: u32) -> f64 {
        self.0
    }
}

/// Test double: L1 distance between band means, ignoring size and shape.
#[derive(Debug, Clone, Copy)]
pub struct MeanDistanceCost;

impl MergeCost for MeanDistanceCost {
    fn cost(&self, a: &Region, b: &Region, _shared_boundary: u32) -> f64 {
        (0..a.bands())
            .map(|band| (a.mean(band) - b.mean(band)).abs())
            .sum()
    }
}

/// Test double: mean distance, except that two single pixels further apart
/// than `gap` cannot merge at all.
#[derive(Debug, Clone, Copy)]
pub struct GatedMeanDistanceCost {
    pub gap: f64,
}

impl MergeCost for GatedMeanDistanceCost {
    fn cost(&self, a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        let distance = MeanDistanceCost.cost(a, b, shared_boundary);
        if a.count() == 1 && b.count() == 1 && distance > self.gap {
            f64::INFINITY
        } else {
            distance
        }
    }
}
