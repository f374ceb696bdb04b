use anyhow::{Context, Result};
use image::{ImageReader, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::info;
use std::path::{Path, PathBuf};

use crate::config::AnnotationStyle;
use crate::pipeline::BoundingBox;
use crate::validate::split_file_name;

/// Path of the annotated copy: `<stem>_copy.<ext>`, using the same
/// first-dot split as the validator, placed in `copy_dir` or next to the
/// source.
pub fn copy_path_for(image_path: &str, copy_dir: Option<&Path>) -> Result<PathBuf> {
    let (stem, extension) = split_file_name(image_path)
        .with_context(|| format!("Cannot derive a copy name for {image_path}"))?;
    let file_name = format!("{stem}_copy.{extension}");

    let dir = match copy_dir {
        Some(dir) => dir,
        None => Path::new(image_path).parent().unwrap_or(Path::new("")),
    };
    Ok(dir.join(file_name))
}

/// Byte-for-byte copy of `source` to `destination`, overwriting it.
pub fn create_copy(source: &Path, destination: &Path) -> Result<()> {
    std::fs::copy(source, destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(())
}

/// Draw one box from `(x, y)` to `(x + width, y + height)` inclusive, the
/// stroke centred on that outline.
pub fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, style: &AnnotationStyle) {
    let color = Rgb(style.color);
    let half = style.thickness as i32 / 2;

    for k in 0..style.thickness as i32 {
        let offset = k - half;
        let width = bbox.width + 1 - 2 * offset;
        let height = bbox.height + 1 - 2 * offset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let outline = Rect::at(bbox.x + offset, bbox.y + offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, outline, color);
    }
}

/// Re-read the copy, draw every face on it and write it back in the format
/// it was stored in.
pub fn annotate_copy(copy_path: &Path, faces: &[BoundingBox], style: &AnnotationStyle) -> Result<()> {
    let reader = ImageReader::open(copy_path)
        .with_context(|| format!("Failed to open {}", copy_path.display()))?
        .with_guessed_format()?;
    let format = reader
        .format()
        .with_context(|| format!("Unknown image format: {}", copy_path.display()))?;
    let mut canvas = reader
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgb8();

    for face in faces {
        draw_box(&mut canvas, face, style);
    }

    canvas
        .save_with_format(copy_path, format)
        .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", copy_path.display(), e))?;

    info!("Drew {} boxes on {}", faces.len(), copy_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_sits_next_to_source() {
        assert_eq!(
            copy_path_for("pics/the_heavy.jpg", None).unwrap(),
            PathBuf::from("pics/the_heavy_copy.jpg")
        );
        assert_eq!(
            copy_path_for("the_heavy.jpg", None).unwrap(),
            PathBuf::from("the_heavy_copy.jpg")
        );
    }

    #[test]
    fn copy_name_keeps_first_dot_split() {
        assert_eq!(
            copy_path_for("a.tar.png", Some(Path::new("out"))).unwrap(),
            PathBuf::from("out/a_copy.tar")
        );
    }

    #[test]
    fn two_pixel_stroke_straddles_outline() {
        let mut canvas = RgbImage::new(20, 20);
        let style = AnnotationStyle::default();
        draw_box(&mut canvas, &BoundingBox::new(5, 5, 8, 8), &style);

        let green = Rgb([0, 255, 0]);
        let black = Rgb([0, 0, 0]);
        // outer ring and the outline itself
        assert_eq!(*canvas.get_pixel(4, 9), green);
        assert_eq!(*canvas.get_pixel(5, 9), green);
        assert_eq!(*canvas.get_pixel(13, 9), green);
        assert_eq!(*canvas.get_pixel(14, 9), green);
        // inside and outside untouched
        assert_eq!(*canvas.get_pixel(6, 9), black);
        assert_eq!(*canvas.get_pixel(3, 9), black);
        assert_eq!(*canvas.get_pixel(9, 9), black);
    }
}
