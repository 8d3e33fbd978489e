use image::GrayImage;

use crate::detection::domain::eye_detector::EyeDetector;
use crate::shared::candidate::FaceBox;

/// Fraction of the face width used as the eye search window side.
const WINDOW_FRACTION: u32 = 5;
/// Horizontal/vertical scan stride in pixels.
const SCAN_STEP: u32 = 2;

/// Heuristic eye detector: finds the darkest window in each upper
/// quadrant of the face crop.
///
/// The angle estimator only consumes the two window centers, so a dark
/// compact structure per upper quadrant is enough signal. Searching the
/// left and right halves independently guarantees the two detections
/// never collapse onto the same eye.
pub struct IntensityEyeDetector;

impl IntensityEyeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IntensityEyeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeDetector for IntensityEyeDetector {
    fn detect(&self, roi: &GrayImage) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let w = roi.width();
        let h = roi.height();
        let window = (w / WINDOW_FRACTION).max(1);
        // Search band: below the forehead, above the nose tip.
        let band_top = h / 5;
        let band_bottom = h / 2;
        if band_bottom <= band_top + window || w < 2 * window {
            return Ok(Vec::new());
        }

        let mut eyes = Vec::with_capacity(2);
        for (x_min, x_max) in [(0, w / 2), (w / 2, w)] {
            if let Some(best) = darkest_window(roi, x_min, x_max, band_top, band_bottom, window) {
                eyes.push(best);
            }
        }
        Ok(eyes)
    }
}

fn darkest_window(
    roi: &GrayImage,
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
    window: u32,
) -> Option<FaceBox> {
    if x_max < x_min + window || y_max < y_min + window {
        return None;
    }

    let mut best: Option<(u64, u32, u32)> = None;
    let mut y = y_min;
    while y + window <= y_max {
        let mut x = x_min;
        while x + window <= x_max {
            let mut sum: u64 = 0;
            for dy in 0..window {
                for dx in 0..window {
                    sum += roi.get_pixel(x + dx, y + dy).0[0] as u64;
                }
            }
            if best.map_or(true, |(s, _, _)| sum < s) {
                best = Some((sum, x, y));
            }
            x += SCAN_STEP;
        }
        y += SCAN_STEP;
    }

    best.map(|(_, x, y)| FaceBox::new(x as i32, y as i32, window as i32, window as i32))
}
