use crate::shared::frame::Frame;

/// Dimensions reported by a source when it opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
}

/// Produces frames for the session loop.
///
/// `open` failing is fatal (the capture device is unavailable). After a
/// successful open, `next_frame` distinguishes the end of the stream
/// (`Ok(None)`, ends the loop normally) from a single bad frame (`Err`,
/// which the loop skips and continues past).
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the capture device. Idempotent.
    fn close(&mut self);
}
