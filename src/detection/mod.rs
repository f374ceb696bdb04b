pub mod cascade;
pub mod grouping;
pub mod preprocessing;
pub mod scan;
pub mod steps;

use anyhow::{Context, Result};
use image::DynamicImage;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::config::DetectionParams;
use crate::detection::cascade::Cascade;
use crate::detection::steps::{FaceDetectionStep, GrayscaleStep};
use crate::pipeline::{BoundingBox, Pipeline};

/// Face detection orchestrator: grayscale conversion followed by a cascade scan
pub struct FaceDetector {
    pipeline: Pipeline,
}

impl FaceDetector {
    pub fn new(cascade: Cascade, params: DetectionParams) -> Self {
        Self {
            pipeline: build_face_pipeline(Arc::new(cascade), params),
        }
    }

    /// Load the cascade from `cascade_path` and build a detector around it
    pub fn from_cascade_file(cascade_path: impl AsRef<Path>, params: DetectionParams) -> Result<Self> {
        let cascade_path = cascade_path.as_ref();
        info!("Loading cascade: {}", cascade_path.display());
        let cascade = Cascade::load(cascade_path)
            .with_context(|| format!("Failed to load cascade {}", cascade_path.display()))?;
        info!(
            "Cascade loaded: {} stages, {} features, window {}x{}",
            cascade.stages.len(),
            cascade.features.len(),
            cascade.window_width,
            cascade.window_height
        );
        Ok(Self::new(cascade, params))
    }

    /// Save intermediate images of every detection run into `output_dir`
    pub fn with_debug(mut self, output_dir: impl AsRef<Path>) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    /// Run the detection pipeline on an image
    pub fn detect(&self, img: DynamicImage) -> Result<Vec<BoundingBox>> {
        let regions = self.pipeline.run(img)?;
        Ok(regions.into_iter().filter_map(|region| region.bbox).collect())
    }
}

/// Build the standard face detection pipeline
pub fn build_face_pipeline(cascade: Arc<Cascade>, params: DetectionParams) -> Pipeline {
    Pipeline::new()
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(FaceDetectionStep { cascade, params }))
}
