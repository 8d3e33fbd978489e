use image::GrayImage;

use crate::shared::candidate::FaceBox;

/// Domain interface for eye-region detection inside a face crop.
///
/// Coordinates are relative to the crop. Detections need no particular
/// order; the angle estimator sorts and filters them.
pub trait EyeDetector: Send {
    fn detect(&self, roi: &GrayImage) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
