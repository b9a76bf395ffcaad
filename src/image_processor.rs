use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::debug;

use crate::errors::{Result, SegError};
use crate::raster::{self, OutputFormat};
use crate::segmenter::{Segmentation, Segmenter};

/// Segments single image files and writes their label rasters.
#[derive(Debug, Clone)]
pub struct RasterProcessor {
    segmenter: Segmenter,
    format: OutputFormat,
}

impl RasterProcessor {
    pub const fn new(segmenter: Segmenter, format: OutputFormat) -> Self {
        Self { segmenter, format }
    }

    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// JSON rasters, plus every image format this build can decode.
    pub fn is_supported_input(&self, path: &Path) -> bool {
        is_json_raster(path)
            || ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
    }

    /// Label raster path for `input_file` inside `output_dir`.
    pub fn output_path(&self, input_file: &Path, output_dir: &Path) -> PathBuf {
        let stem = input_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("raster");
        output_dir.join(raster::output_file_name(stem, &self.segmenter, self.format))
    }

    pub fn segment_file(&self, input_file: &Path) -> Result<Segmentation> {
        if is_json_raster(input_file) {
            let raster = raster::read_json_raster(input_file)?;
            return self.segmenter.segment(raster.view());
        }

        let img = image::open(input_file).map_err(|e| SegError::ImageProcessing {
            path: input_file.display().to_string(),
            operation: "image decoding".to_string(),
            source: Box::new(e),
        })?;
        raster::segment_image(&self.segmenter, &img)
    }

    /// Segment `input_file` and write its labels into `output_dir`.
    pub fn process_image(&self, input_file: &Path, output_dir: &Path) -> Result<PathBuf> {
        let segmentation = self.segment_file(input_file)?;

        fs::create_dir_all(output_dir).map_err(|e| SegError::FileSystem {
            path: output_dir.to_path_buf(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;

        let output_file = self.output_path(input_file, output_dir);
        raster::write_labels(
            &segmentation.labels,
            self.segmenter.params().nodata_sentinel(),
            &output_file,
            self.format,
        )?;

        debug!(
            "{} -> {} ({} regions)",
            input_file.display(),
            output_file.display(),
            segmentation.region_count()
        );
        Ok(output_file)
    }
}

fn is_json_raster(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SegmentParams;

    #[test]
    fn test_supported_formats() {
        let processor = RasterProcessor::new(Segmenter::default(), OutputFormat::Json);
        let test_cases = vec![
            ("scene.tif", true),
            ("scene.TIFF", true),
            ("scene.png", true),
            ("scene.jpeg", true),
            ("scene.bmp", true),
            ("scene.json", true),
            ("scene.gif", cfg!(feature = "image-extra")),
            ("scene.webp", cfg!(feature = "image-extra")),
            ("scene.txt", false),
            ("scene", false),
        ];

        for (filename, expected) in test_cases {
            assert_eq!(
                processor.is_supported_input(Path::new(filename)),
                expected,
                "format check failed for: {filename}"
            );
        }
    }

    #[test]
    fn test_output_path() {
        let processor = RasterProcessor::new(
            Segmenter::new(SegmentParams::default()),
            OutputFormat::Png,
        );
        let path = processor.output_path(Path::new("in/field.tif"), Path::new("out"));
        assert_eq!(path, Path::new("out/field_10_05_05.png"));
    }

    #[test]
    fn test_json_raster_with_many_bands() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let input = dir.path().join("multispectral.json");
        // five bands, 2x4; the left and right halves differ in every band
        let bands: Vec<Vec<Vec<i32>>> = (0..5)
            .map(|band| {
                (0..2)
                    .map(|_| (0..4).map(|col| if col < 2 { band } else { 900 - band }).collect())
                    .collect()
            })
            .collect();
        std::fs::write(&input, serde_json::to_string(&bands)?)?;

        let processor = RasterProcessor::new(Segmenter::default(), OutputFormat::Json);
        let segmentation = processor.segment_file(&input)?;
        assert_eq!(segmentation.labels, ndarray::arr2(&[[0, 0, 1, 1], [0, 0, 1, 1]]));
        assert_eq!(segmentation.regions[0].mean, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_image_error() {
        let processor = RasterProcessor::new(Segmenter::default(), OutputFormat::Json);
        let result = processor.segment_file(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(SegError::ImageProcessing { .. })));
    }
}
