use image::GrayImage;
use imageproc::corners::corners_fast9;
use ndarray::Array2;

use crate::detection::domain::descriptor_extractor::DescriptorExtractor;

const DEFAULT_FAST_THRESHOLD: u8 = 20;
const DEFAULT_MAX_KEYPOINTS: usize = 500;

/// Patch side length sampled around each corner; descriptors are the
/// mean-normalized pixel intensities of the patch, flattened row-major.
const PATCH_SIZE: u32 = 8;

/// Descriptor extractor built on FAST-9 corners with normalized
/// intensity-patch descriptors.
///
/// Corners near the border (no room for a full patch) are skipped. When
/// more corners fire than the keypoint budget, the strongest are kept.
pub struct FastPatchExtractor {
    threshold: u8,
    max_keypoints: usize,
}

impl FastPatchExtractor {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_FAST_THRESHOLD,
            max_keypoints: DEFAULT_MAX_KEYPOINTS,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for FastPatchExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorExtractor for FastPatchExtractor {
    fn extract(
        &self,
        image: &GrayImage,
    ) -> Result<Option<Array2<f32>>, Box<dyn std::error::Error>> {
        let half = PATCH_SIZE / 2;
        if image.width() < PATCH_SIZE || image.height() < PATCH_SIZE {
            return Ok(None);
        }

        let mut corners = corners_fast9(image, self.threshold);
        corners.retain(|c| {
            c.x >= half
                && c.y >= half
                && c.x + half <= image.width()
                && c.y + half <= image.height()
        });
        if corners.is_empty() {
            return Ok(None);
        }
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.max_keypoints);

        let dim = (PATCH_SIZE * PATCH_SIZE) as usize;
        let mut descriptors = Array2::<f32>::zeros((corners.len(), dim));
        for (row, corner) in corners.iter().enumerate() {
            let x0 = corner.x - half;
            let y0 = corner.y - half;

            let mut patch = [0.0f32; (PATCH_SIZE * PATCH_SIZE) as usize];
            let mut sum = 0.0f32;
            for dy in 0..PATCH_SIZE {
                for dx in 0..PATCH_SIZE {
                    let v = image.get_pixel(x0 + dx, y0 + dy).0[0] as f32;
                    patch[(dy * PATCH_SIZE + dx) as usize] = v;
                    sum += v;
                }
            }
            let mean = sum / dim as f32;
            for (col, v) in patch.iter().enumerate() {
                descriptors[[row, col]] = v - mean;
            }
        }
        Ok(Some(descriptors))
    }
}
