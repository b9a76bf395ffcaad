//! Final relabeling of surviving regions into a dense label raster.

use ndarray::Array2;
use num_traits::PrimInt;
use serde::Serialize;

use crate::errors::{Result, SegError};
use crate::grid::PixelGrid;
use crate::params::SegmentParams;
use crate::partition::Partition;
use crate::region::{BoundingBox, RegionStats};

/// Statistics of one labeled object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub label: usize,
    pub pixel_count: u64,
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    pub bbox: BoundingBox,
    pub perimeter: u64,
}

impl RegionSummary {
    fn new(label: usize, stats: RegionStats) -> Self {
        Self {
            label,
            pixel_count: stats.count,
            mean: stats.mean,
            variance: stats.variance,
            bbox: stats.bbox,
            perimeter: stats.perimeter,
        }
    }
}

/// Label raster plus per-label statistics.
#[derive(Debug, Clone)]
pub struct Labeling<L> {
    pub labels: Array2<L>,
    pub regions: Vec<RegionSummary>,
    pub nodata_pixels: usize,
}

/// Assigns labels `0..K` in grid-scan order of each region's first pixel.
#[derive(Debug, Clone, Copy)]
pub struct Labeler<L> {
    /// Output sentinel and the `i64` it came from; `None` when nodata is off.
    nodata: Option<(L, i64)>,
}

impl<L: PrimInt> Labeler<L> {
    /// Fails with `InvalidParameter` when `nodata_label` does not fit `L`.
    pub fn new(nodata_label: i64) -> Result<Self> {
        let converted = L::from(nodata_label).ok_or_else(|| {
            SegError::invalid_parameter(
                "nodata_label",
                format!(
                    "{nodata_label} is not representable in the output label type ({}..={})",
                    L::min_value().to_i64().unwrap_or(i64::MIN),
                    L::max_value().to_i64().unwrap_or(i64::MAX)
                ),
            )
        })?;
        Ok(Self {
            nodata: Some((converted, nodata_label)),
        })
    }

    /// Labeler for grids without nodata pixels; no sentinel is reserved.
    pub const fn without_nodata() -> Self {
        Self { nodata: None }
    }

    /// The sentinel is only reserved when nodata handling is enabled.
    pub fn from_params(params: &SegmentParams) -> Result<Self> {
        match params.nodata {
            Some(_) => Self::new(params.nodata_label),
            None => Ok(Self::without_nodata()),
        }
    }

    pub fn label(&self, grid: &PixelGrid, partition: &Partition) -> Result<Labeling<L>> {
        let resolved = partition.resolve();
        let mut label_of: Vec<Option<L>> = vec![None; partition.store.capacity()];
        let mut regions: Vec<RegionSummary> = Vec::with_capacity(partition.store.live_count());
        let mut data = Vec::with_capacity(grid.len());
        let mut nodata_pixels = 0;

        for root in resolved {
            let Some(root) = root else {
                let (sentinel, _) = self.nodata.ok_or_else(|| {
                    SegError::invalid_parameter(
                        "nodata_label",
                        "raster has nodata pixels but no nodata label is reserved",
                    )
                })?;
                data.push(sentinel);
                nodata_pixels += 1;
                continue;
            };

            let label = match label_of[root.index()] {
                Some(label) => label,
                None => {
                    let next = regions.len();
                    let label = self.convert(next)?;
                    let stats = partition.store.stats(root).ok_or_else(|| {
                        SegError::InvalidMerge {
                            a: root.0,
                            b: root.0,
                            reason: "resolved pixel owner is not a live region".to_string(),
                        }
                    })?;
                    regions.push(RegionSummary::new(next, stats));
                    label_of[root.index()] = Some(label);
                    label
                }
            };
            data.push(label);
        }

        let labels = Array2::from_shape_vec((grid.height(), grid.width()), data)?;
        Ok(Labeling {
            labels,
            regions,
            nodata_pixels,
        })
    }

    fn convert(&self, label: usize) -> Result<L> {
        let converted = L::from(label).ok_or_else(|| SegError::LabelOverflow {
            regions: label + 1,
            reason: format!(
                "label {label} exceeds the maximum {}",
                L::max_value().to_u64().unwrap_or(u64::MAX)
            ),
        })?;
        if let Some((_, sentinel)) = self.nodata {
            if i64::try_from(label).is_ok_and(|l| l == sentinel) {
                return Err(SegError::LabelOverflow {
                    regions: label + 1,
                    reason: format!("label {label} collides with the nodata label"),
                });
            }
        }
        Ok(converted)
    }
}
