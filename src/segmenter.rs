use std::time::Instant;

use log::{debug, info};
use ndarray::{Array2, ArrayView3};
use num_traits::{AsPrimitive, PrimInt};

use tokio_util::sync::CancellationToken;
use crate::errors::Result;
use crate::grid::PixelGrid;
use crate::heterogeneity::Heterogeneity;
use crate::labeler::{Labeler, Labeling, RegionSummary};
use crate::params::SegmentParams;
use crate::partition::Partition;
use crate::scheduler::{MergeScheduler, ScheduleReport};

/// Result of one segmentation run.
#[derive(Debug, Clone)]
pub struct Segmentation<L = i32> {
    /// Label of every pixel, `[row][column]`.
    pub labels: Array2<L>,
    /// Statistics per label, indexed by label.
    pub regions: Vec<RegionSummary>,
    pub nodata_pixels: usize,
    pub report: ScheduleReport,
}

impl<L> Segmentation<L> {
    /// Number of distinct objects `K`.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Region-merging segmentation engine.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    params: SegmentParams,
    cancellation: Option<CancellationToken>,
}

impl Segmenter {
    pub const fn new(params: SegmentParams) -> Self {
        Self {
            params,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub const fn params(&self) -> &SegmentParams {
        &self.params
    }

    /// Segment a `[band][row][column]` array into `i32` labels.
    pub fn segment<T>(&self, array: ArrayView3<T>) -> Result<Segmentation<i32>>
    where
        T: AsPrimitive<f64>,
    {
        self.segment_as(array)
    }

    /// Segment a `[band][row][column]` array into labels of type `L`.
    pub fn segment_as<T, L>(&self, array: ArrayView3<T>) -> Result<Segmentation<L>>
    where
        T: AsPrimitive<f64>,
        L: PrimInt,
    {
        self.params.validate()?;
        let labeler = Labeler::<L>::from_params(&self.params)?;
        let grid = PixelGrid::from_band_major(array, &self.params)?;
        self.run(&grid, &labeler)
    }

    /// Segment an already-built pixel grid.
    pub fn segment_grid<L: PrimInt>(&self, grid: &PixelGrid) -> Result<Segmentation<L>> {
        self.params.validate()?;
        let labeler = Labeler::<L>::from_params(&self.params)?;
        self.run(grid, &labeler)
    }

    fn run<L: PrimInt>(&self, grid: &PixelGrid, labeler: &Labeler<L>) -> Result<Segmentation<L>> {
        let started = Instant::now();
        let mut partition = Partition::seed(grid)?;
        debug!(
            "seeded {} regions and {} edges from a {}x{}x{} raster",
            partition.store.live_count(),
            partition.graph.edge_count(),
            grid.height(),
            grid.width(),
            grid.bands()
        );

        let mut scheduler = MergeScheduler::new(
            Heterogeneity::from_params(&self.params),
            self.params.threshold,
        );
        if let Some(token) = &self.cancellation {
            scheduler = scheduler.with_cancellation(token.clone());
        }
        let report = scheduler.run(&mut partition)?;

        let Labeling {
            labels,
            regions,
            nodata_pixels,
        } = labeler.label(grid, &partition)?;

        info!(
            "segmented {}x{} raster into {} regions ({} merges in {} rounds, {} nodata pixels) in {:.2?}",
            grid.height(),
            grid.width(),
            regions.len(),
            report.merges,
            report.rounds,
            nodata_pixels,
            started.elapsed()
        );

        Ok(Segmentation {
            labels,
            regions,
            nodata_pixels,
            report,
        })
    }
}

/// Segment a `[band][row][column]` array with the given parameters.
///
/// Valid pixels get labels `0..K` in scan order of each object's first
/// pixel; nodata pixels get `params.nodata_label`.
pub fn segment<T>(array: ArrayView3<T>, params: &SegmentParams) -> Result<Array2<i32>>
where
    T: AsPrimitive<f64>,
{
    Segmenter::new(*params)
        .segment(array)
        .map(|segmentation| segmentation.labels)
}

/// Segment a flat pixel-interleaved buffer of `height × width × bands` values.
pub fn segment_interleaved<T>(
    data: &[T],
    height: usize,
    width: usize,
    bands: usize,
    params: &SegmentParams,
) -> Result<Array2<i32>>
where
    T: AsPrimitive<f64>,
{
    params.validate()?;
    let grid = PixelGrid::from_interleaved(data, height, width, bands, params)?;
    Segmenter::new(*params)
        .segment_grid(&grid)
        .map(|segmentation| segmentation.labels)
}
