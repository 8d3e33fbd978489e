use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;

/// JPEG codec adapter over the `image` crate.
pub struct JpegFrameEncoder;

impl JpegFrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let color_type = match frame.channels() {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            n => return Err(format!("unsupported channel count for JPEG: {n}").into()),
        };

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality).write_image(
            frame.data(),
            frame.width(),
            frame.height(),
            color_type,
        )?;
        Ok(out)
    }
}
