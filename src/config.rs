use clap::Parser;
use std::path::PathBuf;

use crate::params::SegmentParams;
use crate::raster::OutputFormat;

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Region-merging segmentation of raster images", long_about = None)]
pub struct Config {
    /// Image file or directory of images
    pub input: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    /// Scale threshold; larger values give larger objects
    #[arg(short, long, default_value_t = 10.0)]
    pub threshold: f64,

    /// Weight of shape against spectral heterogeneity, in [0, 1]
    #[arg(short, long, default_value_t = 0.5)]
    pub shape: f64,

    /// Weight of compactness against smoothness, in [0, 1]
    #[arg(short, long, default_value_t = 0.5)]
    pub compactness: f64,

    /// Band value marking a pixel as nodata
    #[arg(long, allow_hyphen_values = true)]
    pub nodata: Option<f64>,

    /// Label written for nodata pixels
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub nodata_label: i64,

    #[arg(short, long, default_value = "json", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Worker threads, 0 for one per core
    #[arg(short, long, default_value_t = 0)]
    pub num_threads: usize,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn segment_params(&self) -> SegmentParams {
        SegmentParams {
            threshold: self.threshold,
            shape_weight: self.shape,
            compactness_weight: self.compactness,
            nodata: self.nodata,
            nodata_label: self.nodata_label,
        }
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_extension(s)
        .ok_or_else(|| format!("{s} is not supported. Supported formats: `json`, `png`, `tif`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["imageseg", "scene.tif"]);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.segment_params(), SegmentParams::default());
    }

    #[test]
    fn test_flags() {
        let config = Config::parse_from([
            "imageseg",
            "in",
            "out",
            "-t",
            "25",
            "-s",
            "0.2",
            "--nodata",
            "-9999",
            "--nodata-label",
            "-2",
            "-f",
            "tif",
        ]);
        let params = config.segment_params();
        assert_eq!(params.threshold, 25.0);
        assert_eq!(params.shape_weight, 0.2);
        assert_eq!(params.nodata, Some(-9999.0));
        assert_eq!(params.nodata_label, -2);
        assert_eq!(config.format, OutputFormat::Tiff);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Config::try_parse_from(["imageseg", "in", "-f", "bmp"]).is_err());
    }
}
