//! Merge cost from spectral, smoothness and compactness heterogeneity.
//!
//! The spectral term is the merging-variance increase
//! `n1·n2/(n1+n2) · (mean1 − mean2)²`, summed over bands and normalised by
//! the merged pixel count. Shape regularity is measured by two ratios of a
//! region's perimeter: to its bounding-box perimeter (smoothness) and to
//! the square root of its area (compactness). Each shape sub-term is the
//! merged ratio relative to the size-weighted pre-merge ratio, expressed in
//! spectral units:
//!
//! ```text
//! cost = (1 − s)·spectral + s·[(1 − c)·spectral·Δsmooth + c·spectral·Δcompact]
//! ```
//!
//! Two regions with identical band means therefore always merge at zero cost,
//! and the cost is never negative.

use crate::params::SegmentParams;
use crate::region::Region;
use crate::traits::MergeCost;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heterogeneity {
    shape_weight: f64,
    compactness_weight: f64,
}

impl Heterogeneity {
    pub const fn new(shape_weight: f64, compactness_weight: f64) -> Self {
        Self {
            shape_weight,
            compactness_weight,
        }
    }

    pub const fn from_params(params: &SegmentParams) -> Self {
        Self::new(params.shape_weight, params.compactness_weight)
    }

    /// Per-pixel increase of within-region variance, summed over bands.
    pub fn spectral(a: &Region, b: &Region) -> f64 {
        let n1 = a.count() as f64;
        let n2 = b.count() as f64;
        let n = n1 + n2;
        let weight = n1 * n2 / n;
        let increase: f64 = (0..a.bands())
            .map(|band| {
                let diff = a.mean(band) - b.mean(band);
                weight * diff * diff
            })
            .sum();
        increase / n
    }

    /// Merged perimeter / bbox perimeter, relative to the weighted pre-merge ratios.
    pub fn smoothness_ratio(a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        let merged = MergedShape::of(a, b, shared_boundary);
        let before = weighted(a, b, |r| smoothness(r.perimeter(), r.bbox().perimeter()));
        smoothness(merged.perimeter, merged.bbox_perimeter) / before
    }

    /// Merged perimeter / √area, relative to the weighted pre-merge ratios.
    pub fn compactness_ratio(a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        let merged = MergedShape::of(a, b, shared_boundary);
        let before = weighted(a, b, |r| compactness(r.perimeter(), r.count()));
        compactness(merged.perimeter, merged.count) / before
    }

    pub fn evaluate(&self, a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        let spectral = Self::spectral(a, b);
        if spectral == 0.0 {
            return 0.0;
        }

        let s = self.shape_weight;
        let c = self.compactness_weight;
        let smooth_term = spectral * Self::smoothness_ratio(a, b, shared_boundary);
        let compact_term = spectral * Self::compactness_ratio(a, b, shared_boundary);
        let cost = (1.0 - s) * spectral + s * ((1.0 - c) * smooth_term + c * compact_term);

        if cost.is_finite() {
            cost.max(0.0)
        } else {
            f64::INFINITY
        }
    }
}

impl MergeCost for Heterogeneity {
    fn cost(&self, a: &Region, b: &Region, shared_boundary: u32) -> f64 {
        self.evaluate(a, b, shared_boundary)
    }
}

struct MergedShape {
    count: u64,
    perimeter: u64,
    bbox_perimeter: u64,
}

impl MergedShape {
    fn of(a: &Region, b: &Region, shared_boundary: u32) -> Self {
        Self {
            count: a.count() + b.count(),
            perimeter: (a.perimeter() + b.perimeter()).saturating_sub(2 * shared_boundary as u64),
            bbox_perimeter: a.bbox().union(&b.bbox()).perimeter(),
        }
    }
}

fn smoothness(perimeter: u64, bbox_perimeter: u64) -> f64 {
    perimeter as f64 / bbox_perimeter as f64
}

fn compactness(perimeter: u64, count: u64) -> f64 {
    perimeter as f64 / (count as f64).sqrt()
}

fn weighted(a: &Region, b: &Region, ratio: impl Fn(&Region) -> f64) -> f64 {
    let n1 = a.count() as f64;
    let n2 = b.count() as f64;
    (n1 * ratio(a) + n2 * ratio(b)) / (n1 + n2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{RegionId, RegionStore};

    const EPS: f64 = 1e-9;

    fn pair(a: &[f64], b: &[f64]) -> RegionStore {
        let mut store = RegionStore::with_capacity(2);
        store.create(a, 0, 0);
        store.create(b, 0, 1);
        store
    }

    #[test]
    fn test_spectral_two_pixels() {
        let store = pair(&[0.0, 0.0], &[4.0, 2.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();

        // (1·1/2)·(16 + 4) / 2
        assert!((Heterogeneity::spectral(a, b) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_shape_ratios_for_pixel_pair() {
        let store = pair(&[0.0], &[1.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();

        // 1x2 strip: perimeter 6 equals its bbox perimeter
        assert!((Heterogeneity::smoothness_ratio(a, b, 1) - 1.0).abs() < EPS);
        // (6 / √2) / (4 / 1)
        let expected = 6.0 / 2f64.sqrt() / 4.0;
        assert!((Heterogeneity::compactness_ratio(a, b, 1) - expected).abs() < EPS);
    }

    #[test]
    fn test_cost_combination() {
        let store = pair(&[0.0], &[10.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();
        let spectral = 25.0;
        let compact = 6.0 / 2f64.sqrt() / 4.0;

        let pure_spectral = Heterogeneity::new(0.0, 0.5).evaluate(a, b, 1);
        assert!((pure_spectral - spectral).abs() < EPS);

        let pure_smooth = Heterogeneity::new(1.0, 0.0).evaluate(a, b, 1);
        assert!((pure_smooth - spectral).abs() < EPS);

        let pure_compact = Heterogeneity::new(1.0, 1.0).evaluate(a, b, 1);
        assert!((pure_compact - spectral * compact).abs() < EPS);

        let mixed = Heterogeneity::new(0.5, 0.5).evaluate(a, b, 1);
        let expected = 0.5 * spectral + 0.5 * (0.5 * spectral + 0.5 * spectral * compact);
        assert!((mixed - expected).abs() < EPS);
    }

    #[test]
    fn test_cost_is_symmetric_and_zero_for_equal_means() {
        let store = pair(&[3.0, 7.0], &[3.0, 7.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();
        let eval = Heterogeneity::new(0.5, 0.5);
        assert_eq!(eval.evaluate(a, b, 1), 0.0);

        let store = pair(&[1.0, 9.0], &[4.0, 2.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();
        assert_eq!(eval.evaluate(a, b, 1), eval.evaluate(b, a, 1));
        assert!(eval.evaluate(a, b, 1) > 0.0);
    }

    #[test]
    fn test_non_finite_cost_is_infinite() {
        let store = pair(&[f64::INFINITY], &[0.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();
        assert_eq!(
            Heterogeneity::new(0.5, 0.5).evaluate(a, b, 1),
            f64::INFINITY
        );

        let store = pair(&[f64::NAN], &[0.0]);
        let a = store.get(RegionId(0)).unwrap();
        let b = store.get(RegionId(1)).unwrap();
        assert_eq!(
            Heterogeneity::new(0.5, 0.5).evaluate(a, b, 1),
            f64::INFINITY
        );
    }
}
