//! Running a detector over a folder of images.
//!
//! Images are handled one at a time: load, detect, annotate, save. A failure
//! on one image is recorded against that image and the batch carries on;
//! only problems with the output folder, reading the input folder or the
//! console writer end the run early. A missing input folder is an empty run.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};

use crate::annotate::annotate;
use crate::fonts::LabelFont;
use crate::inputs::{ensure_output_dir, find_images};
use crate::models::ObjectDetector;
use crate::summary::{ImageOutcome, RunSummary, EXPECTED_OBJECTS, RULE};
use crate::{Detection, Result};

pub const DEFAULT_INPUT_DIR: &str = "images";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

pub const ANNOTATED_PREFIX: &str = "annotated_";
pub const NO_OBJECTS_PREFIX: &str = "no_objects_";

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub expected: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            expected: EXPECTED_OBJECTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of handling one image successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub detections: Vec<Detection>,
    pub saved_to: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<ImageOutcome>,
    pub summary: RunSummary,
}

/// Where the output for `filename` goes, depending on whether anything was found.
pub fn output_path(output_dir: &Path, filename: &str, has_detections: bool) -> PathBuf {
    let prefix = if has_detections {
        ANNOTATED_PREFIX
    } else {
        NO_OBJECTS_PREFIX
    };
    output_dir.join(format!("{prefix}{filename}"))
}

/// Detect objects in one image and write its output file.
///
/// With detections the annotated copy is encoded in the format implied by
/// the file extension. Without detections the input file is copied as is.
pub fn process_image<D: ObjectDetector + ?Sized>(
    detector: &D,
    font: &LabelFont,
    path: &Path,
    output_dir: &Path,
) -> Result<ProcessedImage> {
    let filename = file_name(path);
    // decoder chosen from the file contents, not the extension
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let img = DynamicImage::ImageRgb8(img.into_rgb8());

    let detections = detector.detect(&img)?;
    let saved_to = output_path(output_dir, &filename, !detections.is_empty());

    if detections.is_empty() {
        std::fs::copy(path, &saved_to)?;
    } else {
        DynamicImage::ImageRgb8(annotate(&img, &detections, font)).save(&saved_to)?;
    }

    Ok(ProcessedImage {
        detections,
        saved_to,
    })
}

/// Process every image of `config.input_dir`, logging progress to `out`, and
/// finish with the run summary.
pub fn run<D: ObjectDetector + ?Sized, W: Write>(
    detector: &D,
    font: &LabelFont,
    config: &RunConfig,
    out: &mut W,
) -> Result<RunReport> {
    if ensure_output_dir(&config.output_dir)? {
        writeln!(out, "Created output folder: {}", config.output_dir.display())?;
    }

    let images = find_images(&config.input_dir)?;
    tracing::info!(
        "processing {} images from {}",
        images.len(),
        config.input_dir.display()
    );
    writeln!(out, "Found {} images to process", images.len())?;
    writeln!(out)?;

    let mut outcomes = Vec::with_capacity(images.len());

    for (i, path) in images.iter().enumerate() {
        let filename = file_name(path);

        writeln!(out, "{RULE}")?;
        writeln!(out, "Processing image {}/{}: {filename}", i + 1, images.len())?;
        writeln!(out, "{RULE}")?;

        let outcome = match process_image(detector, font, path, &config.output_dir) {
            Ok(processed) => {
                report_processed(out, &processed, detector.confidence_threshold())?;
                ImageOutcome::detected(filename, processed.detections)
            }
            Err(err) => {
                tracing::warn!("failed to process {}: {err}", path.display());
                writeln!(out, "❌ Error processing {filename}: {err}")?;
                ImageOutcome::errored(filename, err.to_string())
            }
        };
        outcomes.push(outcome);

        writeln!(out)?;
    }

    let expected: Vec<&str> = config.expected.iter().map(String::as_str).collect();
    let summary = RunSummary::from_outcomes(&outcomes, &expected);

    write!(out, "{summary}")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Processing complete!")?;
    writeln!(out, "Annotated images saved to: {}/", config.output_dir.display())?;
    writeln!(out, "{RULE}")?;

    Ok(RunReport { outcomes, summary })
}

fn report_processed<W: Write>(
    out: &mut W,
    processed: &ProcessedImage,
    threshold: f32,
) -> std::io::Result<()> {
    if processed.detections.is_empty() {
        writeln!(out, "❌ No objects detected with confidence > {threshold}")?;
        writeln!(
            out,
            "  Saved image (no objects): {}",
            processed.saved_to.display()
        )?;
        return Ok(());
    }

    writeln!(out, "Detected objects:")?;
    for detection in &processed.detections {
        writeln!(
            out,
            "  - {} with confidence {:.3} at location {}",
            detection.label,
            detection.rounded_confidence(),
            detection.location()
        )?;
    }
    writeln!(out, "  Saved annotated image: {}", processed.saved_to.display())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        let dir = Path::new("output");
        assert_eq!(
            output_path(dir, "cat.jpg", true),
            Path::new("output/annotated_cat.jpg")
        );
        assert_eq!(
            output_path(dir, "cat.jpg", false),
            Path::new("output/no_objects_cat.jpg")
        );
    }

    #[test]
    fn default_config() {
        let config = RunConfig::default();
        assert_eq!(config.input_dir, Path::new("images"));
        assert_eq!(config.output_dir, Path::new("output"));
        assert_eq!(config.expected.len(), EXPECTED_OBJECTS.len());
    }
}
