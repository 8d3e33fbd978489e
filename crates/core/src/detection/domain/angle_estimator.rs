use crate::detection::domain::eye_detector::EyeDetector;
use crate::detection::domain::roi::crop_gray;
use crate::shared::candidate::FaceBox;
use crate::shared::constants::MIN_EYE_SIZE;
use crate::shared::frame::Frame;

/// Estimates head tilt from eye positions inside a detected face.
pub struct AngleEstimator {
    eye_detector: Box<dyn EyeDetector>,
    min_eye_size: u32,
}

impl AngleEstimator {
    pub fn new(eye_detector: Box<dyn EyeDetector>) -> Self {
        Self {
            eye_detector,
            min_eye_size: MIN_EYE_SIZE,
        }
    }

    pub fn with_min_eye_size(mut self, min_eye_size: u32) -> Self {
        self.min_eye_size = min_eye_size;
        self
    }

    /// Rotation angle in degrees of the line through the two leftmost eye
    /// centers. Returns 0.0 whenever the angle cannot be determined:
    /// empty face crop, fewer than two sufficiently large eye detections,
    /// or vertically stacked centers.
    pub fn estimate(
        &self,
        gray: &Frame,
        face: &FaceBox,
    ) -> Result<f64, Box<dyn std::error::Error>> {
        let roi = match crop_gray(gray, face) {
            Some(roi) => roi,
            None => return Ok(0.0),
        };

        let mut eyes: Vec<FaceBox> = self
            .eye_detector
            .detect(&roi)?
            .into_iter()
            .filter(|e| e.width >= self.min_eye_size as i32 && e.height >= self.min_eye_size as i32)
            .collect();
        if eyes.len() < 2 {
            return Ok(0.0);
        }

        eyes.sort_by_key(|e| e.x);
        let left = center(&eyes[0]);
        let right = center(&eyes[1]);
        Ok(angle_between(left, right))
    }
}

fn center(eye: &FaceBox) -> (f64, f64) {
    (
        eye.x as f64 + eye.width as f64 / 2.0,
        eye.y as f64 + eye.height as f64 / 2.0,
    )
}

/// Angle in degrees of the segment from `p1` to `p2`.
///
/// Identical x-coordinates yield exactly 0.0 rather than ±90°: a vertical
/// eye pair is a detection artifact, not a quarter-turned head.
pub fn angle_between(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let dx = p2.0 - p1.0;
    let dy = p2.1 - p1.1;
    if dx == 0.0 {
        return 0.0;
    }
    dy.atan2(dx).to_degrees()
}
