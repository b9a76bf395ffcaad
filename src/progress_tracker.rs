use std::path::{Path, PathBuf};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::warn;
use parking_lot::Mutex;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::image_processor::RasterProcessor;

/// Outcome of a directory run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Walks an input directory and segments every supported image in parallel.
pub struct ProgressTracker {
    input_dir: PathBuf,
    image_paths: Vec<PathBuf>,
}

impl ProgressTracker {
    pub fn new(input_dir: &Path, processor: &RasterProcessor) -> Self {
        let mut image_paths: Vec<_> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| processor.is_supported_input(e.path()))
            .map(|e| e.into_path())
            .collect();
        image_paths.sort();

        Self {
            input_dir: input_dir.to_path_buf(),
            image_paths,
        }
    }

    pub fn image_paths(&self) -> &[PathBuf] {
        &self.image_paths
    }

    /// Segment every collected image, mirroring subdirectories under `output_dir`.
    pub fn process_images(&self, processor: &RasterProcessor, output_dir: &Path) -> BatchSummary {
        let progress_bar = ProgressBar::new(self.image_paths.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            progress_bar.set_style(style.progress_chars("#>-"));
        }

        let processed = Mutex::new(Vec::with_capacity(self.image_paths.len()));
        let failures = Mutex::new(Vec::new());

        self.image_paths
            .par_iter()
            .progress_with(progress_bar.clone())
            .for_each(|path| {
                let target_dir = self.relocate(path, output_dir);
                match processor.process_image(path, &target_dir) {
                    Ok(output) => processed.lock().push(output),
                    Err(e) => {
                        warn!("failed to segment {}: {e}", path.display());
                        failures.lock().push((path.clone(), e.to_string()));
                    }
                }
            });
        progress_bar.finish();

        let mut summary = BatchSummary {
            processed: processed.into_inner(),
            failures: failures.into_inner(),
        };
        summary.processed.sort();
        summary.failures.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    fn relocate(&self, path: &Path, output_dir: &Path) -> PathBuf {
        path.parent()
            .and_then(|parent| parent.strip_prefix(&self.input_dir).ok())
            .map_or_else(|| output_dir.to_path_buf(), |rel| output_dir.join(rel))
    }
}
