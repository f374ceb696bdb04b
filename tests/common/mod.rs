#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from facecount for tests
pub use facecount::{BoundingBox, Cascade, FaceDetectConfig, FaceDetector, FaceReport};
