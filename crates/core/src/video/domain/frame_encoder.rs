use crate::shared::frame::Frame;

/// Compresses a frame into a transport payload.
///
/// The codec is opaque to the pipeline; quality is in codec units
/// (1-100 for JPEG).
pub trait FrameEncoder: Send {
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Vec<u8>, Box<dyn std::error::Error>>;
}
