//! Region-merging object segmentation for multiband raster imagery.
//!
//! The engine takes a `[band][row][column]` array and four knobs (scale
//! threshold, shape weight, compactness weight, nodata) and returns an
//! integer label raster in which every spatially contiguous object shares
//! one id.
//!
//! ```
//! use imageseg_rs::{segment, SegmentParams};
//! use ndarray::Array3;
//!
//! let image = Array3::<u8>::from_elem((3, 10, 10), 42);
//! let labels = segment(image.view(), &SegmentParams::default()).unwrap();
//! assert!(labels.iter().all(|&label| label == 0));
//! ```

pub mod adjacency;
pub mod config;
pub mod errors;
pub mod grid;
pub mod heterogeneity;
pub mod image_processor;
pub mod labeler;
pub mod params;
pub mod partition;
pub mod progress_tracker;
pub mod raster;
pub mod region;
pub mod scheduler;
pub mod segmenter;
pub mod traits;

pub mod mocks;

pub use config::Config;
pub use errors::{Result, SegError};
pub use grid::PixelGrid;
pub use heterogeneity::Heterogeneity;
pub use image_processor::RasterProcessor;
pub use labeler::{Labeler, RegionSummary};
pub use params::SegmentParams;
pub use progress_tracker::{BatchSummary, ProgressTracker};
pub use raster::OutputFormat;
pub use region::{BoundingBox, RegionId};
pub use scheduler::{MergeHierarchy, MergeScheduler, MergeStep, ScheduleReport};
pub use segmenter::{segment, segment_interleaved, Segmentation, Segmenter};
pub use tokio_util::sync::CancellationToken;
pub use traits::*;
