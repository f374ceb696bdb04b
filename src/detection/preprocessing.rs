use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use std::borrow::Cow;

// BT.601 luma in 14-bit fixed point, the weights Haar cascades are trained on
const LUMA_SHIFT: u32 = 14;
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;

/// Convert image to grayscale with BT.601 weights
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = img {
        return gray.clone();
    }

    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
        Luma([((luma + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8])
    })
}

/// Bilinear resize to `(width, height)`; borrows when the size already matches
pub fn resize_gray(img: &GrayImage, width: u32, height: u32) -> Cow<'_, GrayImage> {
    if img.dimensions() == (width, height) {
        Cow::Borrowed(img)
    } else {
        Cow::Owned(imageops::resize(img, width, height, FilterType::Triangle))
    }
}
