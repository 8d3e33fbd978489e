use std::time::Instant;

/// A single captured frame: contiguous pixel bytes in row-major order.
///
/// `channels` is 3 for RGB and 1 for grayscale. Format conversion happens
/// at I/O boundaries only; the pipeline runs detection on the grayscale
/// view and ships the color buffer to the encoder untouched.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    captured_at: Instant,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            captured_at: Instant::now(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Monotonic capture timestamp.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Grayscale view of this frame (Rec. 601 luma for RGB input).
    ///
    /// Keeps the index and capture timestamp so downstream stages see the
    /// same frame identity.
    pub fn to_luma(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }
        let mut luma = Vec::with_capacity(self.width as usize * self.height as usize);
        for px in self.data.chunks_exact(self.channels as usize) {
            let y = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000;
            luma.push(y as u8);
        }
        Frame {
            data: luma,
            width: self.width,
            height: self.height,
            channels: 1,
            index: self.index,
            captured_at: self.captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_to_luma_dimensions() {
        let frame = Frame::new(vec![128; 4 * 2 * 3], 4, 2, 3, 7);
        let gray = frame.to_luma();
        assert_eq!(gray.channels(), 1);
        assert_eq!(gray.width(), 4);
        assert_eq!(gray.height(), 2);
        assert_eq!(gray.index(), 7);
        assert_eq!(gray.data().len(), 8);
    }

    #[test]
    fn test_to_luma_weights() {
        // Pure red, green, blue pixels.
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255];
        let frame = Frame::new(data, 3, 1, 3, 0);
        let gray = frame.to_luma();
        assert_eq!(gray.data(), &[76, 149, 29]);
    }

    #[test]
    fn test_to_luma_on_gray_is_identity() {
        let frame = Frame::new(vec![10, 20, 30, 40], 2, 2, 1, 0);
        let gray = frame.to_luma();
        assert_eq!(gray.data(), frame.data());
        assert_eq!(gray.channels(), 1);
    }

    #[test]
    fn test_timestamp_preserved_by_to_luma() {
        let frame = Frame::new(vec![0; 3], 1, 1, 3, 0);
        let gray = frame.to_luma();
        assert_eq!(gray.captured_at(), frame.captured_at());
    }
}
