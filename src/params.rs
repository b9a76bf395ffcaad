use serde::{Deserialize, Serialize};

use crate::errors::{Result, SegError};

/// Tunable parameters of one segmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Scale threshold: no merge proceeds once its cost reaches this value.
    pub threshold: f64,
    /// Weight of shape regularity against spectral homogeneity, in `[0, 1]`.
    pub shape_weight: f64,
    /// Weight of compactness against smoothness inside the shape term, in `[0, 1]`.
    pub compactness_weight: f64,
    /// Pixels holding this value in any band are excluded. `None` disables nodata handling.
    pub nodata: Option<f64>,
    /// Label written to nodata pixels.
    pub nodata_label: i64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            shape_weight: 0.5,
            compactness_weight: 0.5,
            nodata: None,
            nodata_label: -1,
        }
    }
}

impl SegmentParams {
    pub fn new(threshold: f64, shape_weight: f64, compactness_weight: f64) -> Self {
        Self {
            threshold,
            shape_weight,
            compactness_weight,
            ..Self::default()
        }
    }

    /// Build nodata handling from an enabled flag plus a value, the way the
    /// raster tooling usually carries it.
    pub fn from_flags(
        threshold: f64,
        shape_weight: f64,
        compactness_weight: f64,
        nodata_enabled: bool,
        nodata_value: f64,
    ) -> Self {
        Self {
            nodata: nodata_enabled.then_some(nodata_value),
            ..Self::new(threshold, shape_weight, compactness_weight)
        }
    }

    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub const fn with_nodata(mut self, value: f64) -> Self {
        self.nodata = Some(value);
        self
    }

    pub const fn with_nodata_label(mut self, label: i64) -> Self {
        self.nodata_label = label;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SegError::invalid_parameter(
                "threshold",
                format!("must be a finite value >= 0, got {}", self.threshold),
            ));
        }
        check_unit_interval("shape_weight", self.shape_weight)?;
        check_unit_interval("compactness_weight", self.compactness_weight)?;
        Ok(())
    }

    /// Label reserved for nodata pixels, if nodata handling is enabled.
    pub fn nodata_sentinel(&self) -> Option<i64> {
        self.nodata.map(|_| self.nodata_label)
    }

    /// True when `value` is the configured nodata value. NaN matches NaN.
    #[inline]
    pub fn is_nodata_value(&self, value: f64) -> bool {
        match self.nodata {
            Some(nodata) if nodata.is_nan() => value.is_nan(),
            Some(nodata) => value == nodata,
            None => false,
        }
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SegError::invalid_parameter(
            field,
            format!("must be within [0, 1], got {value}"),
        ))
    }
}
