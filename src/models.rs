use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::BoundingBox;

/// Sidecar record written after every successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceReport {
    pub count_faces: usize,
    /// The image path exactly as it was passed in.
    pub image_location: String,
}

impl FaceReport {
    pub fn new(count_faces: usize, image_location: impl Into<String>) -> Self {
        Self {
            count_faces,
            image_location: image_location.into(),
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub faces: Vec<BoundingBox>,
    pub copy_path: PathBuf,
    pub report_path: PathBuf,
}
