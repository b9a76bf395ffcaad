//! Read-only pixel access over the input raster.

use ndarray::ArrayView3;
use num_traits::AsPrimitive;

use crate::errors::{Result, SegError};
use crate::params::SegmentParams;

/// Immutable, pixel-interleaved view of a `height × width × bands` raster.
///
/// Values are widened to `f64` once at construction so every later
/// statistic works on one numeric type regardless of the input dtype.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    height: usize,
    width: usize,
    bands: usize,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl PixelGrid {
    /// Build from a `[band][row][column]` array.
    pub fn from_band_major<T>(array: ArrayView3<T>, params: &SegmentParams) -> Result<Self>
    where
        T: AsPrimitive<f64>,
    {
        let (bands, height, width) = array.dim();
        check_dimensions(height, width, bands)?;

        // Iterating the permuted view walks row, column, band in logical order.
        let values: Vec<f64> = array
            .permuted_axes([1, 2, 0])
            .iter()
            .map(|&v| v.as_())
            .collect();

        Ok(Self::from_values(values, height, width, bands, params))
    }

    /// Build from a flat pixel-interleaved buffer (`[row][column][band]`).
    pub fn from_interleaved<T>(
        data: &[T],
        height: usize,
        width: usize,
        bands: usize,
        params: &SegmentParams,
    ) -> Result<Self>
    where
        T: AsPrimitive<f64>,
    {
        check_dimensions(height, width, bands)?;
        let expected = height
            .checked_mul(width)
            .and_then(|n| n.checked_mul(bands))
            .ok_or_else(|| SegError::invalid_shape("raster dimensions overflow usize"))?;
        if data.len() != expected {
            return Err(SegError::invalid_shape(format!(
                "buffer holds {} values, expected {height}x{width}x{bands} = {expected}",
                data.len()
            )));
        }

        let values = data.iter().map(|&v| v.as_()).collect();
        Ok(Self::from_values(values, height, width, bands, params))
    }

    fn from_values(
        values: Vec<f64>,
        height: usize,
        width: usize,
        bands: usize,
        params: &SegmentParams,
    ) -> Self {
        let valid = values
            .chunks_exact(bands)
            .map(|pixel| !pixel.iter().any(|&v| params.is_nodata_value(v)))
            .collect();

        Self {
            height,
            width,
            bands,
            values,
            valid,
        }
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn bands(&self) -> usize {
        self.bands
    }

    pub const fn len(&self) -> usize {
        self.height * self.width
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    #[inline]
    pub const fn coordinate(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Band vector of the pixel at `(row, col)`.
    #[inline]
    pub fn pixel(&self, row: usize, col: usize) -> &[f64] {
        self.pixel_at(self.index(row, col))
    }

    #[inline]
    pub fn pixel_at(&self, index: usize) -> &[f64] {
        let start = index * self.bands;
        &self.values[start..start + self.bands]
    }

    #[inline]
    pub fn is_nodata(&self, row: usize, col: usize) -> bool {
        !self.valid[self.index(row, col)]
    }

    #[inline]
    pub fn is_valid_at(&self, index: usize) -> bool {
        self.valid[index]
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }
}

fn check_dimensions(height: usize, width: usize, bands: usize) -> Result<()> {
    if height == 0 || width == 0 || bands == 0 {
        return Err(SegError::invalid_shape(format!(
            "raster must have non-zero dimensions, got {height}x{width}x{bands} (height x width x bands)"
        )));
    }
    Ok(())
}
