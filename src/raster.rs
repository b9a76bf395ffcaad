//! Decoding image files into engine input and encoding label rasters.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Pixel};
use ndarray::{Array2, Array3};
use nshare::AsNdarray3;
use num_traits::AsPrimitive;

use crate::errors::{Result, SegError};
use crate::segmenter::{Segmentation, Segmenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Nested JSON arrays, one per row.
    #[default]
    Json,
    /// 16-bit grayscale PNG holding `label + 1`, nodata as 0.
    Png,
    /// 16-bit grayscale TIFF holding `label + 1`, nodata as 0.
    Tiff,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Png => "png",
            Self::Tiff => "tif",
        }
    }

    const fn image_format(&self) -> Option<ImageFormat> {
        match self {
            Self::Json => None,
            Self::Png => Some(ImageFormat::Png),
            Self::Tiff => Some(ImageFormat::Tiff),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Segment a decoded image, keeping its native sample type.
///
/// Grayscale images become one band, colour images three; alpha is dropped.
pub fn segment_image(segmenter: &Segmenter, image: &DynamicImage) -> Result<Segmentation> {
    use DynamicImage::*;

    match image {
        ImageLuma16(_) | ImageLumaA16(_) => segment_buffer(segmenter, &image.to_luma16()),
        ImageRgb16(_) | ImageRgba16(_) => segment_buffer(segmenter, &image.to_rgb16()),
        ImageRgb32F(_) | ImageRgba32F(_) => segment_buffer(segmenter, &image.to_rgb32f()),
        _ if image.color().has_color() => segment_buffer(segmenter, &image.to_rgb8()),
        _ => segment_buffer(segmenter, &image.to_luma8()),
    }
}

fn segment_buffer<P>(
    segmenter: &Segmenter,
    buffer: &ImageBuffer<P, Vec<P::Subpixel>>,
) -> Result<Segmentation>
where
    P: Pixel + 'static,
    P::Subpixel: AsPrimitive<f64>,
{
    segmenter.segment(buffer.as_ndarray3())
}

/// Read a raster stored as nested JSON arrays, `[band][row][column]`.
pub fn read_json_raster(path: &Path) -> Result<Array3<f64>> {
    let file = File::open(path).map_err(|e| SegError::FileSystem {
        path: path.to_path_buf(),
        operation: "raster file open".to_string(),
        source: e,
    })?;
    let nested: Vec<Vec<Vec<f64>>> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SegError::ImageProcessing {
            path: path.display().to_string(),
            operation: "JSON raster decoding".to_string(),
            source: Box::new(e),
        })?;
    nested_to_array(nested)
}

/// Parse a `[band][row][column]` JSON array.
pub fn parse_json_raster(text: &str) -> Result<Array3<f64>> {
    nested_to_array(serde_json::from_str(text)?)
}

fn nested_to_array(nested: Vec<Vec<Vec<f64>>>) -> Result<Array3<f64>> {
    let bands = nested.len();
    let height = nested.first().map_or(0, Vec::len);
    let width = nested
        .first()
        .and_then(|band| band.first())
        .map_or(0, Vec::len);

    let mut values = Vec::with_capacity(bands * height * width);
    for (b, band) in nested.into_iter().enumerate() {
        if band.len() != height {
            return Err(SegError::invalid_shape(format!(
                "band {b} has {} rows, expected {height}",
                band.len()
            )));
        }
        for (r, row) in band.into_iter().enumerate() {
            if row.len() != width {
                return Err(SegError::invalid_shape(format!(
                    "band {b} row {r} has {} columns, expected {width}",
                    row.len()
                )));
            }
            values.extend(row);
        }
    }

    Ok(Array3::from_shape_vec((bands, height, width), values)?)
}

/// Write a label raster in the requested format.
///
/// `nodata_label` is the reserved sentinel, `None` when nodata is disabled.
pub fn write_labels(
    labels: &Array2<i32>,
    nodata_label: Option<i64>,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    match format.image_format() {
        None => write_json(labels, path),
        Some(image_format) => {
            let image = label_image(labels, nodata_label)?;
            image
                .save_with_format(path, image_format)
                .map_err(|e| SegError::ImageProcessing {
                    path: path.display().to_string(),
                    operation: "label image save".to_string(),
                    source: Box::new(e),
                })
        }
    }
}

fn write_json(labels: &Array2<i32>, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SegError::FileSystem {
        path: path.to_path_buf(),
        operation: "label file creation".to_string(),
        source: e,
    })?;
    let rows: Vec<Vec<i32>> = labels.rows().into_iter().map(|row| row.to_vec()).collect();

    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &rows)?;
    writer.flush().map_err(|e| SegError::FileSystem {
        path: path.to_path_buf(),
        operation: "label file write".to_string(),
        source: e,
    })
}

/// Shift labels by one into `u16` so that 0 can mark nodata.
pub fn label_image(
    labels: &Array2<i32>,
    nodata_label: Option<i64>,
) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>> {
    let (height, width) = labels.dim();
    let pixels = labels
        .iter()
        .map(|&label| {
            if nodata_label == Some(i64::from(label)) {
                return Ok(0);
            }
            u16::try_from(i64::from(label) + 1).map_err(|_| SegError::LabelOverflow {
                regions: label.max(0) as usize + 1,
                reason: format!("label {label} does not fit a 16-bit label image"),
            })
        })
        .collect::<Result<Vec<u16>>>()?;

    ImageBuffer::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        SegError::invalid_shape(format!("label buffer does not match {width}x{height}"))
    })
}

/// `<stem>_<t>_<s>_<c>.<ext>`, with decimal points dropped from each parameter.
pub fn output_file_name(stem: &str, segmenter: &Segmenter, format: OutputFormat) -> String {
    let params = segmenter.params();
    format!(
        "{stem}_{}_{}_{}.{}",
        compact_number(params.threshold),
        compact_number(params.shape_weight),
        compact_number(params.compactness_weight),
        format.extension()
    )
}

fn compact_number(value: f64) -> String {
    value.to_string().replace('.', "")
}
