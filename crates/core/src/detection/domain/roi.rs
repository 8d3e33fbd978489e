use image::GrayImage;

use crate::shared::candidate::FaceBox;
use crate::shared::frame::Frame;

/// Crops a region out of a grayscale frame, clamped to the frame bounds.
///
/// Returns `None` when the clamped region is empty (fully outside the
/// frame or degenerate), so callers can treat malformed boxes as "no
/// pixels" rather than an error.
pub fn crop_gray(gray: &Frame, region: &FaceBox) -> Option<GrayImage> {
    debug_assert_eq!(gray.channels(), 1, "crop_gray expects a grayscale frame");

    let fw = gray.width() as i32;
    let fh = gray.height() as i32;

    let x1 = region.x.clamp(0, fw);
    let y1 = region.y.clamp(0, fh);
    let x2 = (region.x + region.width).clamp(0, fw);
    let y2 = (region.y + region.height).clamp(0, fh);

    let w = x2 - x1;
    let h = y2 - y1;
    if w <= 0 || h <= 0 {
        return None;
    }

    let mut out = Vec::with_capacity((w * h) as usize);
    let stride = gray.width() as usize;
    let data = gray.data();
    for row in y1..y2 {
        let start = row as usize * stride + x1 as usize;
        out.extend_from_slice(&data[start..start + w as usize]);
    }
    GrayImage::from_raw(w as u32, h as u32, out)
}
