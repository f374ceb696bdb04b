use crate::config::DetectionParams;
use crate::detection::cascade::Cascade;
use crate::detection::preprocessing;
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use anyhow::Result;
use image::DynamicImage;
use log::info;
use std::borrow::Cow;
use std::sync::Arc;

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let gray = preprocessing::to_grayscale(&item.image);
            result.push(PipelineData {
                image: DynamicImage::ImageLuma8(gray),
                original: item.original.clone(),
                bbox: item.bbox,
            });
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Run the cascade over each image - splits one image into one item per face
pub struct FaceDetectionStep {
    pub cascade: Arc<Cascade>,
    pub params: DetectionParams,
}

impl PipelineStep for FaceDetectionStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let gray = match &item.image {
                DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
                other => Cow::Owned(preprocessing::to_grayscale(other)),
            };
            let faces = self.cascade.detect_multi_scale(&gray, &self.params)?;
            info!("Detected {} faces", faces.len());

            for bbox in faces {
                // face crops are only looked at in debug output
                let image = if context.debug.is_some() {
                    // crop_imm clamps to the image, boxes may overhang after grouping
                    item.original.crop_imm(
                        bbox.x.max(0) as u32,
                        bbox.y.max(0) as u32,
                        bbox.width.max(0) as u32,
                        bbox.height.max(0) as u32,
                    )
                } else {
                    DynamicImage::new_luma8(0, 0)
                };
                result.push(PipelineData::from_region(image, item.original.clone(), bbox));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Face Detection"
    }
}
