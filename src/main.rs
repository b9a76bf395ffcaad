use anyhow::{ensure, Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::{info, warn};
use rayon::ThreadPoolBuilder;

use imageseg_rs::{Config, ProgressTracker, RasterProcessor, Segmenter};

fn setup_logging(level: &str) -> Result<LoggerHandle> {
    Logger::try_with_env_or_str(level)
        .context("invalid log level")?
        .log_to_stderr()
        .start()
        .context("logger initialization failed")
}

fn main() -> Result<()> {
    let config = Config::parse();
    let _logger = setup_logging(&config.log_level)?;

    ensure!(
        config.input.exists(),
        "Input path does not exist: {}",
        config.input.display()
    );

    let params = config.segment_params();
    params.validate().context("invalid segmentation parameters")?;

    if config.num_threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()?;
    }

    let processor = RasterProcessor::new(Segmenter::new(params), config.format);

    if config.input.is_file() {
        let output = processor
            .process_image(&config.input, &config.output_dir)
            .with_context(|| format!("Failed to segment {}", config.input.display()))?;
        info!("wrote {}", output.display());
        return Ok(());
    }

    let tracker = ProgressTracker::new(&config.input, &processor);
    ensure!(
        !tracker.image_paths().is_empty(),
        "No supported images found in {}",
        config.input.display()
    );
    info!(
        "segmenting {} images with threshold {}, shape {}, compactness {}",
        tracker.image_paths().len(),
        params.threshold,
        params.shape_weight,
        params.compactness_weight
    );

    let summary = tracker.process_images(&processor, &config.output_dir);
    info!(
        "{} images written to {}",
        summary.processed.len(),
        config.output_dir.display()
    );
    for (path, reason) in &summary.failures {
        warn!("{}: {reason}", path.display());
    }
    ensure!(
        summary.is_success(),
        "{} images failed to segment",
        summary.failures.len()
    );
    Ok(())
}
