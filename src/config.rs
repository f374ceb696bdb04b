use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_CASCADE_PATH: &str = "haarcascade_frontalface_default.xml";
pub const DEFAULT_REPORT_PATH: &str = "faces.json";

/// Parameters of the multi-scale cascade scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionParams {
    /// Growth of the search window between scales. Must be > 1.
    pub scale_factor: f64,
    /// A grouped detection needs more than this many raw hits to survive.
    /// Zero disables grouping.
    pub min_neighbors: u32,
    /// Smallest window searched, `(width, height)`.
    pub min_size: (u32, u32),
    /// Largest window searched; the image size when unset.
    pub max_size: Option<(u32, u32)>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.21,
            min_neighbors: 5,
            min_size: (30, 30),
            max_size: None,
        }
    }
}

/// How detections are drawn on the image copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotationStyle {
    /// RGB
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
        }
    }
}

/// Everything a single face-count run needs besides the image path.
///
/// Missing fields in a config file fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaceDetectConfig {
    pub cascade_path: PathBuf,
    pub detection: DetectionParams,
    pub annotation: AnnotationStyle,
    /// Where the JSON record goes. Relative paths resolve against the
    /// working directory.
    pub report_path: PathBuf,
    /// Directory for the annotated copy; next to the input when unset.
    pub copy_dir: Option<PathBuf>,
    /// Save intermediate pipeline images here (must be empty or absent).
    pub debug_dir: Option<PathBuf>,
}

impl Default for FaceDetectConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            detection: DetectionParams::default(),
            annotation: AnnotationStyle::default(),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            copy_dir: None,
            debug_dir: None,
        }
    }
}

impl FaceDetectConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}
