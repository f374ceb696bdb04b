use facecount::{DetectionParams, FaceDetectConfig};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::path::{Path, PathBuf};

/// Side of the test cascade's detection window.
pub const WINDOW: u32 = 24;

/// Background level of the non-face tiles.
pub const GRAY: u8 = 128;

/// One-stage cascade that fires on a window whose top half is much brighter
/// than its bottom half (feature = top sum - bottom sum, normalized).
pub const BRIGHT_OVER_DARK_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>24</height>
  <width>24</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 24 24 -1.</_>
        <_>
          0 0 24 12 2.</_></rects></_></features></cascade>
</opencv_storage>
"#;

/// Writes the test cascade into `dir` and returns its path.
pub fn write_cascade(dir: &Path) -> PathBuf {
    let path = dir.join("test_cascade.xml");
    std::fs::write(&path, BRIGHT_OVER_DARK_CASCADE).expect("Failed to write test cascade");
    path
}

/// A horizontal strip of 24x24 tiles. `true` tiles are "faces" (white top
/// half, black bottom half), `false` tiles are flat gray.
pub fn tile_strip(tiles: &[bool]) -> GrayImage {
    let width = WINDOW * tiles.len() as u32;
    GrayImage::from_fn(width, WINDOW, |x, y| {
        if tiles[(x / WINDOW) as usize] {
            if y < WINDOW / 2 { Luma([255]) } else { Luma([0]) }
        } else {
            Luma([GRAY])
        }
    })
}

/// A gray `width`x`height` image with one square face tile of side `size`
/// whose top-left corner is at `(x, y)`.
pub fn face_at(width: u32, height: u32, x: u32, y: u32, size: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |px, py| {
        let inside = (x..x + size).contains(&px) && (y..y + size).contains(&py);
        if !inside {
            Luma([GRAY])
        } else if py < y + size / 2 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Saves `img` under `dir/name` with an explicit format and returns the path
/// as the string the pipeline expects.
pub fn save_image(dir: &Path, name: &str, img: &GrayImage, format: ImageFormat) -> String {
    let path = dir.join(name);
    // stored as RGB, like photos; GIF has no grayscale encoding
    DynamicImage::ImageLuma8(img.clone())
        .to_rgb8()
        .save_with_format(&path, format)
        .expect("Failed to save test image");
    path.to_str().expect("temp path is not UTF-8").to_string()
}

/// Scan parameters that search only the cascade's native window size.
pub fn native_scale_params(min_neighbors: u32) -> DetectionParams {
    DetectionParams {
        scale_factor: 2.5,
        min_neighbors,
        min_size: (0, 0),
        max_size: None,
    }
}

/// Config whose every output lands inside `dir`.
pub fn test_config(dir: &Path, min_neighbors: u32) -> FaceDetectConfig {
    FaceDetectConfig {
        cascade_path: write_cascade(dir),
        detection: native_scale_params(min_neighbors),
        report_path: dir.join("faces.json"),
        ..FaceDetectConfig::default()
    }
}

/// Names of the files directly inside `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|entry| entry.expect("bad entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
