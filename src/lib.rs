pub mod annotate;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod validate;

pub use config::{AnnotationStyle, DetectionParams, FaceDetectConfig};
pub use detection::FaceDetector;
pub use detection::cascade::Cascade;
pub use error::{CascadeError, ValidationError};
pub use models::{DetectionOutcome, FaceReport};
pub use pipeline::{BoundingBox, Pipeline, PipelineContext, PipelineData, PipelineStep};
pub use runner::{detect_faces, run};
