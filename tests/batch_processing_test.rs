use std::fs;
use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use tempfile::TempDir;

use imageseg_rs::{OutputFormat, ProgressTracker, RasterProcessor, SegmentParams, Segmenter};

/// Left half black, right half white.
fn two_tone(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

fn read_json_labels(path: &Path) -> Result<Vec<Vec<i32>>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[test]
fn test_single_image_to_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("scene.png");
    two_tone(6, 2).save(&input)?;

    let processor = RasterProcessor::new(Segmenter::default(), OutputFormat::Json);
    let output = processor.process_image(&input, &temp_dir.path().join("out"))?;

    assert_eq!(output, temp_dir.path().join("out/scene_10_05_05.json"));
    let labels = read_json_labels(&output)?;
    assert_eq!(labels, vec![vec![0, 0, 0, 1, 1, 1], vec![0, 0, 0, 1, 1, 1]]);
    Ok(())
}

#[test]
fn test_single_image_to_label_png() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("gray.png");
    // zero pixels are nodata
    let gray = GrayImage::from_fn(4, 4, |x, _| if x == 0 { Luma([0]) } else { Luma([90]) });
    gray.save(&input)?;

    let params = SegmentParams::default().with_nodata(0.0);
    let processor = RasterProcessor::new(Segmenter::new(params), OutputFormat::Png);
    let output = processor.process_image(&input, temp_dir.path())?;

    let written: ImageBuffer<Luma<u16>, Vec<u16>> = image::open(&output)?.into_luma16();
    assert_eq!(written.dimensions(), (4, 4));
    for y in 0..4 {
        assert_eq!(written.get_pixel(0, y).0, [0]);
        for x in 1..4 {
            assert_eq!(written.get_pixel(x, y).0, [1]);
        }
    }
    Ok(())
}

#[test]
fn test_directory_run_mirrors_layout() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(input_dir.join("tiles"))?;

    two_tone(8, 4).save(input_dir.join("a.png"))?;
    two_tone(4, 4).save(input_dir.join("tiles/b.png"))?;
    fs::write(input_dir.join("readme.txt"), b"not an image")?;

    let processor = RasterProcessor::new(
        Segmenter::new(SegmentParams::new(5.0, 0.5, 0.5)),
        OutputFormat::Json,
    );
    let tracker = ProgressTracker::new(&input_dir, &processor);
    assert_eq!(tracker.image_paths().len(), 2);

    let summary = tracker.process_images(&processor, &output_dir);
    assert!(summary.is_success(), "failures: {:?}", summary.failures);
    assert_eq!(
        summary.processed,
        vec![
            output_dir.join("a_5_05_05.json"),
            output_dir.join("tiles/b_5_05_05.json"),
        ]
    );

    let labels = read_json_labels(&output_dir.join("tiles/b_5_05_05.json"))?;
    assert_eq!(labels.len(), 4);
    assert!(labels.iter().all(|row| row == &vec![0, 0, 1, 1]));
    Ok(())
}

#[test]
fn test_corrupt_image_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    fs::create_dir_all(&input_dir)?;
    two_tone(4, 2).save(input_dir.join("good.png"))?;
    fs::write(input_dir.join("broken.png"), b"definitely not a png")?;

    let processor = RasterProcessor::new(Segmenter::default(), OutputFormat::Json);
    let tracker = ProgressTracker::new(&input_dir, &processor);
    let summary = tracker.process_images(&processor, &temp_dir.path().join("output"));

    assert_eq!(summary.processed.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, input_dir.join("broken.png"));
    Ok(())
}
