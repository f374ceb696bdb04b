use anyhow::{Context, Result};
use image::ImageReader;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::annotate;
use crate::config::FaceDetectConfig;
use crate::detection::FaceDetector;
use crate::models::{DetectionOutcome, FaceReport};
use crate::report;
use crate::validate::validate_image_path;

/// Detect faces in `image_path`, write the annotated copy and the JSON
/// report.
///
/// Returns `Ok(None)` when the path is rejected by validation; in that case
/// nothing is read or written. Every other failure is an error.
pub fn run(image_path: &str, config: &FaceDetectConfig) -> Result<Option<DetectionOutcome>> {
    if let Err(err) = validate_image_path(image_path) {
        warn!("{err}");
        return Ok(None);
    }

    let mut detector =
        FaceDetector::from_cascade_file(&config.cascade_path, config.detection.clone())?;
    if let Some(debug_dir) = &config.debug_dir {
        detector = detector.with_debug(debug_dir)?;
    }

    info!("Loading image: {}", image_path);
    let img = ImageReader::open(image_path)
        .with_context(|| format!("Failed to open image {image_path}"))?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    info!("Image loaded: {}x{}", img.width(), img.height());

    let faces = detector.detect(img)?;

    let copy_path = annotate::copy_path_for(image_path, config.copy_dir.as_deref())?;
    annotate::create_copy(Path::new(image_path), &copy_path)?;
    annotate::annotate_copy(&copy_path, &faces, &config.annotation)?;

    let report_path = report::write_report(
        &config.report_path,
        &FaceReport::new(faces.len(), image_path),
    )?;

    Ok(Some(DetectionOutcome {
        faces,
        copy_path,
        report_path,
    }))
}

/// Same as [`run`], returning only the path of the JSON report.
pub fn detect_faces(image_path: &str, config: &FaceDetectConfig) -> Result<Option<PathBuf>> {
    Ok(run(image_path, config)?.map(|outcome| outcome.report_path))
}
