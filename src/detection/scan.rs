use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image};
use log::debug;

use crate::config::DetectionParams;
use crate::detection::cascade::{Cascade, HaarFeature};
use crate::detection::grouping::{GROUP_EPS, group_rectangles};
use crate::detection::preprocessing::resize_gray;
use crate::error::CascadeError;
use crate::pipeline::BoundingBox;

/// Stage sums this close below the threshold still pass.
const STAGE_EPS: f64 = 1e-5;

/// Summed-area tables of one scaled grayscale image.
pub struct IntegralImages {
    stride: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImages {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        Self {
            stride: width as usize + 1,
            sum: integral_image::<_, u64>(gray).into_raw(),
            sq_sum: integral_squared_image::<_, u64>(gray).into_raw(),
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rect(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        let top_left = table[y * stride + x];
        let top_right = table[y * stride + x + w];
        let bottom_left = table[(y + h) * stride + x];
        let bottom_right = table[(y + h) * stride + x + w];
        ((top_left + bottom_right) - (top_right + bottom_left)) as f64
    }

    /// Sum of pixel values in the `w`×`h` rectangle at `(x, y)`.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::rect(&self.sum, self.stride, x, y, w, h)
    }

    /// Sum of squared pixel values in the `w`×`h` rectangle at `(x, y)`.
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::rect(&self.sq_sum, self.stride, x, y, w, h)
    }
}

fn feature_value(feature: &HaarFeature, ii: &IntegralImages, x: u32, y: u32) -> f64 {
    feature
        .rects
        .iter()
        .map(|r| r.weight * ii.rect_sum(x + r.x, y + r.y, r.width, r.height))
        .sum()
}

impl Cascade {
    /// Contrast normalization of the window at `(x, y)`: the standard
    /// deviation (times area) over the window shrunk by one pixel per side.
    fn variance_norm(&self, ii: &IntegralImages, x: u32, y: u32) -> f64 {
        let (w, h) = (self.window_width - 2, self.window_height - 2);
        let area = (w * h) as f64;
        let sum = ii.rect_sum(x + 1, y + 1, w, h);
        let sq_sum = ii.rect_sq_sum(x + 1, y + 1, w, h);
        let nf = area * sq_sum - sum * sum;
        if nf > 0.0 { nf.sqrt() } else { 1.0 }
    }

    /// Evaluate the cascade on the window whose top-left corner is `(x, y)`.
    ///
    /// Returns 1 when every stage passes, otherwise `-k` where `k` is the
    /// index of the rejecting stage (0 means the first stage rejected).
    pub fn run_at(&self, ii: &IntegralImages, x: u32, y: u32) -> i32 {
        let norm = self.variance_norm(ii, x, y);

        for (stage_idx, stage) in self.stages.iter().enumerate() {
            let total: f64 = stage
                .classifiers
                .iter()
                .map(|c| c.predict(|f| feature_value(&self.features[f], ii, x, y) / norm))
                .sum();
            if total < stage.threshold - STAGE_EPS {
                return -(stage_idx as i32);
            }
        }
        1
    }

    /// Slide the cascade over one scaled image, returning hits mapped back to
    /// original-image coordinates.
    fn scan_scale(&self, ii: &IntegralImages, factor: f64, window: (u32, u32)) -> Vec<BoundingBox> {
        let (width, height) = ii.dimensions();
        let span_x = width - self.window_width + 1;
        let span_y = height - self.window_height + 1;
        let step = if factor > 2.0 { 1 } else { 2 };

        let mut hits = Vec::new();
        let mut y = 0;
        while y < span_y {
            let mut x = 0;
            while x < span_x {
                let result = self.run_at(ii, x, y);
                if result > 0 {
                    hits.push(BoundingBox::new(
                        (x as f64 * factor).round() as i32,
                        (y as f64 * factor).round() as i32,
                        window.0 as i32,
                        window.1 as i32,
                    ));
                }
                if result == 0 {
                    x += step;
                }
                x += step;
            }
            y += step;
        }
        hits
    }

    /// Raw window hits across every scale, before grouping.
    pub fn scan_candidates(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<BoundingBox>, CascadeError> {
        if !(params.scale_factor > 1.0) {
            return Err(CascadeError::InvalidParams(format!(
                "scale factor must be greater than 1, got {}",
                params.scale_factor
            )));
        }

        let (img_w, img_h) = gray.dimensions();
        let (max_w, max_h) = match params.max_size {
            Some((w, h)) if w > 0 && h > 0 => (w, h),
            _ => (img_w, img_h),
        };
        let (min_w, min_h) = params.min_size;

        let mut candidates = Vec::new();
        let mut factor = 1.0f64;
        loop {
            let window = (
                (self.window_width as f64 * factor).round() as u32,
                (self.window_height as f64 * factor).round() as u32,
            );
            if window.0 > max_w || window.1 > max_h {
                break;
            }

            if window.0 >= min_w && window.1 >= min_h {
                let scaled_w = (img_w as f64 / factor).round() as u32;
                let scaled_h = (img_h as f64 / factor).round() as u32;
                if scaled_w < self.window_width || scaled_h < self.window_height {
                    break;
                }

                let scaled = resize_gray(gray, scaled_w, scaled_h);
                let ii = IntegralImages::new(&scaled);
                let hits = self.scan_scale(&ii, factor, window);
                debug!(
                    "scale {:.3}: window {}x{}, image {}x{}, {} hits",
                    factor,
                    window.0,
                    window.1,
                    scaled_w,
                    scaled_h,
                    hits.len()
                );
                candidates.extend(hits);
            }

            factor *= params.scale_factor;
        }

        Ok(candidates)
    }

    /// Detect objects at every scale and group the raw hits.
    pub fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<BoundingBox>, CascadeError> {
        let candidates = self.scan_candidates(gray, params)?;
        let grouped = group_rectangles(candidates, params.min_neighbors, GROUP_EPS);
        Ok(grouped)
    }
}
