//! Integration tests for the full validate → detect → annotate → report run.
//!
//! Tests cover:
//! - Rejected paths leaving the filesystem untouched
//! - Zero and multiple detections in the report and on the copy
//! - Repeated runs converging on the same files
//! - Fatal errors (missing cascade, unreadable image)
//! - Debug output of the detection pipeline

mod common;

use common::*;
use facecount::report::read_report;
use facecount::{detect_faces, run};
use image::{ImageFormat, Rgb};

#[test]
fn test_multi_dot_name_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 1);
    let image_path = save_image(dir.path(), "photo.v2.png", &tile_strip(&[true]), ImageFormat::Png);

    let before = file_names(dir.path());
    let result = detect_faces(&image_path, &config)?;

    assert!(result.is_none());
    assert_eq!(file_names(dir.path()), before);
    assert!(!dir.path().join("faces.json").exists());

    Ok(())
}

#[test]
fn test_disallowed_and_empty_paths_return_none() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 1);

    assert!(detect_faces("", &config)?.is_none());
    assert!(detect_faces("notes.txt", &config)?.is_none());
    assert!(detect_faces("README", &config)?.is_none());
    assert!(!dir.path().join("faces.json").exists());

    Ok(())
}

#[test]
fn test_no_faces_still_writes_copy_and_report() -> anyhow::Result<()> {
    // 1. A JPEG with a single window position and no structure
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 5);
    let flat = image::GrayImage::from_pixel(WINDOW, WINDOW, image::Luma([GRAY]));
    let image_path = save_image(dir.path(), "the_heavy.jpg", &flat, ImageFormat::Jpeg);

    // 2. Run the pipeline
    let report_path = detect_faces(&image_path, &config)?.expect("valid image path");

    // 3. Report records zero faces and the path as given
    assert_eq!(report_path, dir.path().join("faces.json"));
    assert_eq!(read_report(&report_path)?, FaceReport::new(0, image_path.as_str()));

    // 4. The copy exists next to the original and is still a JPEG
    let copy_path = dir.path().join("the_heavy_copy.jpg");
    assert!(copy_path.exists());
    let reader = image::ImageReader::open(&copy_path)?.with_guessed_format()?;
    assert_eq!(reader.format(), Some(ImageFormat::Jpeg));

    Ok(())
}

#[test]
fn test_faces_are_counted_and_drawn() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 1);
    let image_path = save_image(
        dir.path(),
        "group.png",
        &tile_strip(&[true, false, false, true]),
        ImageFormat::Png,
    );

    let outcome = run(&image_path, &config)?.expect("valid image path");

    assert_eq!(outcome.faces.len(), 2);
    assert_eq!(outcome.copy_path, dir.path().join("group_copy.png"));
    assert_eq!(read_report(&outcome.report_path)?.count_faces, 2);

    let copy = image::open(&outcome.copy_path)?.to_rgb8();
    let green = Rgb([0, 255, 0]);
    for face in &outcome.faces {
        // top edge of every box
        assert_eq!(*copy.get_pixel(face.x as u32, 0), green);
    }
    // background between the two faces is left alone
    assert_eq!(*copy.get_pixel(48, 12), Rgb([GRAY, GRAY, GRAY]));

    // the original is never modified
    let original = image::open(&image_path)?.to_luma8();
    assert_eq!(original, tile_strip(&[true, false, false, true]));

    Ok(())
}

#[test]
fn test_repeated_runs_give_identical_outputs() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 1);
    let image_path = save_image(
        dir.path(),
        "group.png",
        &tile_strip(&[true, false, false, true]),
        ImageFormat::Png,
    );

    let first = run(&image_path, &config)?.expect("valid image path");
    let copy_bytes = std::fs::read(&first.copy_path)?;
    let report_bytes = std::fs::read(&first.report_path)?;

    let second = run(&image_path, &config)?.expect("valid image path");

    assert_eq!(first.faces, second.faces);
    assert_eq!(std::fs::read(&second.copy_path)?, copy_bytes);
    assert_eq!(std::fs::read(&second.report_path)?, report_bytes);

    Ok(())
}

#[test]
fn test_copy_dir_redirects_annotated_copy() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let out = tempfile::TempDir::new()?;
    let mut config = test_config(dir.path(), 1);
    config.copy_dir = Some(out.path().to_path_buf());
    let image_path = save_image(dir.path(), "one.gif", &tile_strip(&[true]), ImageFormat::Gif);

    let outcome = run(&image_path, &config)?.expect("valid image path");

    assert_eq!(outcome.copy_path, out.path().join("one_copy.gif"));
    assert!(outcome.copy_path.exists());
    assert!(!dir.path().join("one_copy.gif").exists());

    Ok(())
}

#[test]
fn test_missing_cascade_fails_before_copying() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mut config = test_config(dir.path(), 1);
    config.cascade_path = dir.path().join("missing.xml");
    let image_path = save_image(dir.path(), "group.png", &tile_strip(&[true]), ImageFormat::Png);

    assert!(run(&image_path, &config).is_err());
    assert!(!dir.path().join("group_copy.png").exists());
    assert!(!dir.path().join("faces.json").exists());

    Ok(())
}

#[test]
fn test_unreadable_image_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = test_config(dir.path(), 1);
    let image_path = dir.path().join("broken.png");
    std::fs::write(&image_path, b"not really a png")?;

    let result = run(image_path.to_str().expect("utf-8 path"), &config);

    assert!(result.is_err());
    assert!(!dir.path().join("broken_copy.png").exists());

    Ok(())
}

#[test]
fn test_debug_output_has_one_directory_per_step() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mut config = test_config(dir.path(), 1);
    let debug_dir = dir.path().join("debug");
    config.debug_dir = Some(debug_dir.clone());
    let image_path = save_image(
        dir.path(),
        "group.png",
        &tile_strip(&[true, false, false, true]),
        ImageFormat::Png,
    );

    run(&image_path, &config)?.expect("valid image path");

    assert!(debug_dir.join("00_input/01.png").exists());
    assert!(debug_dir.join("01_grayscale_conversion/01.png").exists());
    assert_eq!(
        file_names(&debug_dir.join("02_face_detection")),
        vec!["01.png".to_string(), "02.png".to_string()]
    );

    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mut config = test_config(dir.path(), 1);
    let debug_dir = dir.path().join("debug");
    std::fs::create_dir_all(&debug_dir)?;
    std::fs::write(debug_dir.join("leftover.txt"), "x")?;
    config.debug_dir = Some(debug_dir);
    let image_path = save_image(dir.path(), "group.png", &tile_strip(&[true]), ImageFormat::Png);

    assert!(run(&image_path, &config).is_err());

    Ok(())
}
