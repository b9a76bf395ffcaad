//! Region store: running aggregates for every live region.

use std::fmt;

use serde::Serialize;

use crate::errors::{Result, SegError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

impl RegionId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive pixel bounds of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl BoundingBox {
    pub const fn pixel(row: usize, col: usize) -> Self {
        Self {
            min_row: row,
            max_row: row,
            min_col: col,
            max_col: col,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_row: self.min_row.min(other.min_row),
            max_row: self.max_row.max(other.max_row),
            min_col: self.min_col.min(other.min_col),
            max_col: self.max_col.max(other.max_col),
        }
    }

    pub const fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub const fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    /// Perimeter of the box in grid-edge units.
    pub const fn perimeter(&self) -> u64 {
        2 * (self.height() + self.width()) as u64
    }
}

/// Aggregate statistics of one region. Everything is a sum, so merging is
/// order-independent.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    count: u64,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    bbox: BoundingBox,
    perimeter: u64,
}

impl Region {
    fn singleton(values: &[f64], row: usize, col: usize) -> Self {
        Self {
            count: 1,
            sum: values.to_vec(),
            sum_sq: values.iter().map(|v| v * v).collect(),
            bbox: BoundingBox::pixel(row, col),
            perimeter: 4,
        }
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub const fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub const fn perimeter(&self) -> u64 {
        self.perimeter
    }

    pub fn bands(&self) -> usize {
        self.sum.len()
    }

    #[inline]
    pub fn mean(&self, band: usize) -> f64 {
        self.sum[band] / self.count as f64
    }

    /// Population variance of one band, clamped at zero against rounding.
    #[inline]
    pub fn variance(&self, band: usize) -> f64 {
        let mean = self.mean(band);
        (self.sum_sq[band] / self.count as f64 - mean * mean).max(0.0)
    }

    pub fn stats(&self) -> RegionStats {
        let bands = 0..self.bands();
        RegionStats {
            count: self.count,
            mean: bands.clone().map(|b| self.mean(b)).collect(),
            variance: bands.map(|b| self.variance(b)).collect(),
            bbox: self.bbox,
            perimeter: self.perimeter,
        }
    }

    fn absorb(&mut self, other: Region, shared_boundary: u32) {
        self.count += other.count;
        for (acc, v) in self.sum.iter_mut().zip(&other.sum) {
            *acc += v;
        }
        for (acc, v) in self.sum_sq.iter_mut().zip(&other.sum_sq) {
            *acc += v;
        }
        self.bbox = self.bbox.union(&other.bbox);
        self.perimeter = self.perimeter + other.perimeter - 2 * shared_boundary as u64;
    }
}

/// Derived view of a region's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub count: u64,
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    pub bbox: BoundingBox,
    pub perimeter: u64,
}

// A merged slot forwards to its survivor. Survivors always carry the
// lower id, so forwarding ids strictly decrease.
#[derive(Debug, Clone)]
enum RegionSlot {
    Here(Region),
    There(RegionId),
}

/// Arena of region slots indexed by `RegionId`.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    slots: Vec<RegionSlot>,
    live: usize,
}

impl RegionStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
        }
    }

    /// Allocate a singleton region for one valid pixel.
    pub fn create(&mut self, values: &[f64], row: usize, col: usize) -> RegionId {
        let id = RegionId(self.slots.len() as u32);
        self.slots
            .push(RegionSlot::Here(Region::singleton(values, row, col)));
        self.live += 1;
        id
    }

    /// Number of ids ever allocated, merged or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of regions not yet absorbed by a merge.
    pub const fn live_count(&self) -> usize {
        self.live
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        match self.slots.get(id.index()) {
            Some(RegionSlot::Here(region)) => Some(region),
            _ => None,
        }
    }

    pub fn is_live(&self, id: RegionId) -> bool {
        self.get(id).is_some()
    }

    pub fn stats(&self, id: RegionId) -> Option<RegionStats> {
        self.get(id).map(Region::stats)
    }

    /// Merge `a` and `b`, which share `shared_boundary` grid edges.
    /// The lower id survives and is returned.
    pub fn merge(&mut self, a: RegionId, b: RegionId, shared_boundary: u32) -> Result<RegionId> {
        if a == b {
            return Err(invalid_merge(a, b, "region merged with itself"));
        }
        let (survivor, absorbed) = if a < b { (a, b) } else { (b, a) };
        let (Some(kept), Some(gone)) = (self.get(survivor), self.get(absorbed)) else {
            return Err(invalid_merge(a, b, "region is not live"));
        };
        if 2 * shared_boundary as u64 > kept.perimeter + gone.perimeter {
            return Err(invalid_merge(a, b, "shared boundary exceeds perimeters"));
        }

        let slot = std::mem::replace(
            &mut self.slots[absorbed.index()],
            RegionSlot::There(survivor),
        );
        if let (RegionSlot::Here(absorbed_region), RegionSlot::Here(region)) =
            (slot, &mut self.slots[survivor.index()])
        {
            region.absorb(absorbed_region, shared_boundary);
        }
        self.live -= 1;
        Ok(survivor)
    }

    /// Surviving region of every allocated id, in one ascending pass.
    pub fn roots(&self) -> Vec<RegionId> {
        let mut roots = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let root = match slot {
                RegionSlot::Here(_) => RegionId(index as u32),
                RegionSlot::There(target) => roots[target.index()],
            };
            roots.push(root);
        }
        roots
    }

    pub fn live_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, RegionSlot::Here(_)))
            .map(|(index, _)| RegionId(index as u32))
    }
}

fn invalid_merge(a: RegionId, b: RegionId, reason: &str) -> SegError {
    SegError::InvalidMerge {
        a: a.0,
        b: b.0,
        reason: reason.to_string(),
    }
}
